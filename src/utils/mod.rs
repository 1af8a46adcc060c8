pub mod hashing;
pub mod record;

use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the Unix epoch, the timestamp prefix of audit lines.
pub fn timestamp_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0)
}
