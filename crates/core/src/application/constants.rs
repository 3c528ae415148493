// Runner constants (No magic values)

/// Statement used by the preflight connectivity check
pub const PREFLIGHT_STATEMENT: &str = "DESCRIBE KEYSPACES";

/// Maximum number of bytes of client output copied into a single log event
pub const MAX_LOGGED_OUTPUT_BYTES: usize = 16 * 1024;

/// Process exit code for preflight, configuration or usage errors
pub const EXIT_ABORTED: u8 = 2;
