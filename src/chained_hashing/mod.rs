pub mod bucket;
pub mod table;

/// Bucket count used when the caller does not pick one.
pub const DEFAULT_NUM_BUCKETS: usize = 100;
