//! The public C-style API (spec §2, §7): every call collapses the scheduler
//! module's `Result<_, ThreadError>` down to a plain `i32` — non-negative on
//! success, `-1` on an application error, with the error logged either way.
//! A system failure (a failed `sigaction`/`setitimer`/allocation) instead
//! tears the process down outright, since there's no sane value to hand
//! back to a caller in that state.

use crate::error::ThreadError;
use crate::scheduler;
use crate::thread::ThreadEntry;

fn collapse(err: ThreadError) -> i32 {
    log::error!("thread library error: {err}");
    if err.is_system_failure() {
        std::process::exit(1);
    }
    -1
}

/// Initializes the thread library with a `quantum_usecs`-microsecond
/// quantum. Must be called exactly once, before any other function here.
pub fn init(quantum_usecs: i64) -> i32 {
    match scheduler::init(quantum_usecs) {
        Ok(()) => 0,
        Err(err) => collapse(err),
    }
}

/// Spawns a new thread that will run `entry` the first time it's
/// dispatched, returning its id.
pub fn spawn(entry: ThreadEntry) -> i32 {
    match scheduler::spawn(entry) {
        Ok(id) => id,
        Err(err) => collapse(err),
    }
}

/// Terminates thread `tid`. `tid == 0` tears down the whole library and
/// exits the process; terminating the calling thread never returns here.
pub fn terminate(tid: i32) -> i32 {
    match scheduler::terminate(tid) {
        Ok(()) => 0,
        Err(err) => collapse(err),
    }
}

/// Moves `tid` to the `BLOCKED` state. A no-op if it's already blocked.
pub fn block(tid: i32) -> i32 {
    match scheduler::block(tid) {
        Ok(()) => 0,
        Err(err) => collapse(err),
    }
}

/// Moves a blocked `tid` back to `READY`, or clears a pending block on a
/// sleeping thread. A no-op otherwise.
pub fn resume(tid: i32) -> i32 {
    match scheduler::resume(tid) {
        Ok(()) => 0,
        Err(err) => collapse(err),
    }
}

/// Puts the calling thread to sleep for `num_quantums` full quanta.
pub fn sleep(num_quantums: i64) -> i32 {
    match scheduler::sleep(num_quantums) {
        Ok(()) => 0,
        Err(err) => collapse(err),
    }
}

/// Returns the id of the calling thread.
pub fn get_tid() -> i32 {
    match scheduler::get_tid() {
        Ok(tid) => tid,
        Err(err) => collapse(err),
    }
}

/// Returns the total number of quanta elapsed since `init`.
pub fn get_total_quantums() -> i32 {
    match scheduler::get_total_quantums() {
        Ok(count) => count as i32,
        Err(err) => collapse(err),
    }
}

/// Returns the number of quanta thread `tid` has spent running.
pub fn get_quantums(tid: i32) -> i32 {
    match scheduler::get_quantums(tid) {
        Ok(count) => count as i32,
        Err(err) => collapse(err),
    }
}
