//! Central Configuration Constants
//!
//! Single source of truth for pipeline-wide defaults.

/// How many times the unit loader re-reads a file whose content is not
/// yet parseable (writers may create the name before finishing the write).
pub const LOAD_RETRY_BUDGET: u32 = 5;

/// Sleep between unit loader retries (milliseconds)
pub const LOAD_RETRY_BACKOFF_MS: u64 = 25;

/// Standard deviation below this is treated as zero variance; the volume
/// standardizes to an all-zero feature vector instead of dividing by it.
pub const STD_EPSILON: f32 = 1e-6;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "rtdecode";
