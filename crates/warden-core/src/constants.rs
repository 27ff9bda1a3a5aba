//! Package-level constants.

/// Current version of the Warden engine (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "warden";

/// Name of the project-local directory holding governance documents.
pub const DATA_DIR_NAME: &str = ".warden";
