//! The thread control block (spec §3, component C1).

use crate::arch::Context;
use crate::config::AWAKE;
use crate::thread::stack::Stack;

/// The zero-argument function a thread runs the first time it is scheduled.
pub type ThreadEntry = fn();

/// The states a thread can occupy (spec §3).
///
/// `SLEEPING` and `BLOCKED` are documented as distinct but composable (a
/// thread may be blocked while sleeping); spec §9 leaves the representation
/// to the implementation. `uthreads` takes option (a): `state` alone only
/// ever holds one of these four values, and the orthogonal
/// [`Tcb::sleep_blocked`] flag records a block that arrived while the
/// thread was already `Sleeping`, so the wake sweep can land it on
/// `Blocked` instead of `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Sleeping,
}

/// A thread control block.
pub struct Tcb {
    /// Immutable identity within `[0, MAX_THREAD_NUM)`.
    pub id: i32,
    /// Invoked the first time this thread is dispatched.
    pub entry: ThreadEntry,
    /// The thread's private stack. `None` only for the main thread (id 0),
    /// which runs on the process's own stack instead of a heap-allocated
    /// one.
    pub stack: Option<Stack>,
    /// Current scheduling state.
    pub state: ThreadState,
    /// Set when a thread already `Sleeping` is also `block`ed (spec §4.7,
    /// §9). Meaningless unless `state == Sleeping`.
    pub sleep_blocked: bool,
    /// Saved/synthesized register context for the context-switch primitive.
    pub context: Context,
    /// Quanta completed while this thread was selected to run.
    pub quanta_run: i64,
    /// Absolute quantum at which a sleeping thread should wake, or `AWAKE`.
    pub wake_at: i64,
}

impl Tcb {
    /// Builds the main thread's TCB (id 0). Its context is left zeroed:
    /// `init` fills it in with the first real `save` against the process's
    /// own stack rather than synthesizing one (spec §4.7).
    pub fn main_thread() -> Tcb {
        Tcb {
            id: 0,
            entry: || {},
            stack: None,
            state: ThreadState::Running,
            sleep_blocked: false,
            context: Context::zeroed(),
            quanta_run: 0,
            wake_at: AWAKE,
        }
    }

    /// Builds a freshly spawned thread's TCB with a synthesized context
    /// that, once jumped to, starts executing `trampoline` atop `stack`.
    pub fn spawned(
        id: i32,
        entry: ThreadEntry,
        stack: Stack,
        trampoline: extern "C" fn() -> !,
    ) -> Tcb {
        let stack_pointer = stack.initial_stack_pointer();
        let context = Context::synthesize(trampoline, stack_pointer);
        Tcb {
            id,
            entry,
            stack: Some(stack),
            state: ThreadState::Ready,
            sleep_blocked: false,
            context,
            quanta_run: 0,
            wake_at: AWAKE,
        }
    }

    /// Takes ownership of the stack out of the TCB, for deferred teardown
    /// (spec §4.6 step 8 / §4.7's "frees the TCB only after having switched
    /// onto another stack").
    pub fn take_stack(&mut self) -> Option<Stack> {
        self.stack.take()
    }
}
