//! Compile-time constants (spec §6).

/// The cap on simultaneously live threads, including the main thread (id 0).
pub const MAX_THREAD_NUM: usize = 100;

/// Per-thread stack buffer size, in bytes.
pub const STACK_SIZE: usize = 4096;

/// The sentinel `wake_at` value for a thread that isn't sleeping (spec §3).
pub const AWAKE: i64 = -1;
