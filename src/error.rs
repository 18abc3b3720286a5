//! Error kinds for the thread library (see spec §7).

use thiserror::Error;

/// Application-level and system-level failures a library call can hit.
///
/// `Display` text is logged by the public API layer before being collapsed
/// to the `-1`/exit-code convention described in the module documentation.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// `init` was called with a non-positive quantum length.
    #[error("quantum_usecs must be positive, got {0}")]
    NonPositiveQuantum(i64),

    /// `spawn` was given a null/missing entry point.
    #[error("spawn requires a non-null entry point")]
    NullEntryPoint,

    /// `spawn` was called while `MAX_THREAD_NUM` threads are already live.
    #[error("maximum thread count ({0}) already reached")]
    TooManyThreads(usize),

    /// An operation referenced a tid with no corresponding TCB.
    #[error("no thread with id {0}")]
    UnknownThread(i32),

    /// An operation referenced a negative tid.
    #[error("thread id must be non-negative, got {0}")]
    NegativeId(i32),

    /// `sleep` was given a negative quantum count.
    #[error("sleep duration must be non-negative, got {0}")]
    NegativeSleepDuration(i64),

    /// `block`/`sleep`/`terminate` targeted the main thread where that is
    /// disallowed.
    #[error("operation not permitted on the main thread")]
    MainThreadDisallowed,

    /// A public API call was made before `init`.
    #[error("the scheduler has not been initialized")]
    NotInitialized,

    /// `init` was called a second time without an intervening teardown.
    #[error("the scheduler is already initialized")]
    AlreadyInitialized,

    /// Installing the quantum signal handler failed.
    #[error("failed to install the quantum signal handler: {0}")]
    SigactionFailed(std::io::Error),

    /// Arming or disarming the quantum timer failed.
    #[error("failed to configure the quantum timer: {0}")]
    SetitimerFailed(std::io::Error),

    /// Allocating a thread's private stack failed.
    #[error("failed to allocate a {0}-byte thread stack")]
    StackAllocationFailed(usize),
}

impl ThreadError {
    /// True for the "system failure" row of spec §7: these never return
    /// `-1`, they tear the library down and exit the process.
    pub fn is_system_failure(&self) -> bool {
        matches!(
            self,
            ThreadError::SigactionFailed(_)
                | ThreadError::SetitimerFailed(_)
                | ThreadError::StackAllocationFailed(_)
        )
    }
}
