//! Crate-wide constants.

/// Application name, used for default data directories.
pub const APP_NAME: &str = "remake";

/// Length of the truncated hash used for store file names.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Environment variable overriding the metadata store location.
pub const STORE_ENV: &str = "REMAKE_STORE";

/// Environment variable overriding the default job limit.
pub const JOBS_ENV: &str = "REMAKE_JOBS";
