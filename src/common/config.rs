/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_POOL_SIZE: usize = 50;

/// Upper bound for the random lock-wait timeout, in milliseconds.
/// Each lock request draws its own timeout from `[0, this)` and aborts
/// once its total wait exceeds the draw.
pub const LOCK_TIMEOUT_MAX_MS: u64 = 2000;

/// Maximum byte length of a string field's payload. Every string field
/// occupies `4 + STRING_LEN` bytes on disk regardless of content.
pub const STRING_LEN: usize = 128;
