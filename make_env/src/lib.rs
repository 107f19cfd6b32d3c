#![forbid(unsafe_code)]

//! Shared environment constants used across makegen crates (library, tests, and
//! helpers).

/// Environment variable override for the native make program.
///
/// When set, the runner invokes this program instead of the backend's
/// default (`wmake`, `make`, or `nmake`).
///
/// # Examples
///
/// ```
/// use make_env::MAKE_PROGRAM_ENV;
/// assert_eq!(MAKE_PROGRAM_ENV, "MAKEGEN_MAKE");
/// ```
pub const MAKE_PROGRAM_ENV: &str = "MAKEGEN_MAKE";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "MAKEGEN_CONFIG_PATH";
