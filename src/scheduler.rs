//! The scheduler (spec §4.6, §4.7, component C7): the single piece of code
//! that ever touches more than one TCB's `context`, and the only code that
//! calls [`arch::save`]/[`arch::jump`].
//!
//! Global state lives behind a single `spin::Mutex`, the way `aticu-VeOS`
//! keeps its scheduler lists behind a lock shared by the tick interrupt and
//! ordinary syscalls. The one rule that matters: nothing ever holds that
//! lock across a `save`/`jump` call, since `jump` can hand control to
//! another thread for an arbitrary stretch of wall-clock time. Every block
//! below either finishes with the lock dropped, or extracts a raw pointer
//! and drops the guard before touching `arch`.

use lazy_static::lazy_static;
use spin::Mutex;

use crate::arch::{self, Context};
use crate::config::{AWAKE, MAX_THREAD_NUM, STACK_SIZE};
use crate::error::ThreadError;
use crate::id_alloc::IdAllocator;
use crate::ready_queue::ReadyQueue;
use crate::sleep_index::SleepIndex;
use crate::thread::{Stack, Tcb, ThreadEntry, ThreadState};
use crate::timer;

struct SchedulerState {
    threads: Vec<Option<Tcb>>,
    ready: ReadyQueue,
    sleeping: SleepIndex,
    ids: IdAllocator,
    quantum_usecs: i64,
    /// Completed quanta since `init`; the initial dispatch of the main
    /// thread counts as quantum 1 (spec §3).
    total_quantums: i64,
    /// `quanta_run` contributed by threads that have since been destroyed,
    /// kept so `Σ quanta_run` over every thread ever spawned stays checkable
    /// after ids are reused.
    total_retired_quanta: i64,
    current_tid: i32,
    /// The departing thread's stack, freed once the switch away from it has
    /// actually completed (spec §4.6 step 8 / §4.7).
    pending_teardown: Option<Stack>,
}

impl SchedulerState {
    /// Moves every thread whose `wake_at` matches the quantum that is about
    /// to start back onto the ready queue (or onto `Blocked`, if a `block`
    /// arrived while it slept). Must run before that quantum's dispatch, so
    /// a thread waking this tick is eligible to be chosen this tick.
    fn wake_sweep(&mut self) {
        for id in self.sleeping.take_due(self.total_quantums) {
            let Some(tcb) = self.threads[id as usize].as_mut() else { continue };
            if tcb.state != ThreadState::Sleeping || tcb.wake_at != self.total_quantums {
                continue;
            }
            tcb.wake_at = AWAKE;
            if tcb.sleep_blocked {
                tcb.sleep_blocked = false;
                tcb.state = ThreadState::Blocked;
            } else {
                tcb.state = ThreadState::Ready;
                self.ready.push_back(id);
            }
        }
    }
}

lazy_static! {
    static ref STATE: Mutex<Option<SchedulerState>> = Mutex::new(None);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// A quantum expired; the current thread goes to the back of the queue.
    Tick,
    /// The current thread is leaving the ready queue on its own (blocked or
    /// asleep) but keeps its context to resume later.
    YieldBlocked,
    /// The current thread is never coming back; its TCB and stack are torn
    /// down instead of saved.
    TerminateSelf,
}

fn validate_tid(state: &SchedulerState, tid: i32) -> Result<(), ThreadError> {
    if tid < 0 {
        return Err(ThreadError::NegativeId(tid));
    }
    if tid as usize >= MAX_THREAD_NUM || state.threads[tid as usize].is_none() {
        return Err(ThreadError::UnknownThread(tid));
    }
    Ok(())
}

/// Removes a non-current thread from every structure that might reference
/// it and releases its id. Used by `terminate` on a target other than the
/// caller; the caller's own teardown instead goes through
/// [`run_scheduler`]'s `TerminateSelf` path, since it must keep running on
/// its own stack until the context switch away from it completes.
fn purge_thread(state: &mut SchedulerState, tid: i32) {
    let mut tcb = state.threads[tid as usize].take().expect("validated by the caller");
    state.ready.remove(tid);
    if tcb.state == ThreadState::Sleeping {
        state.sleeping.remove(tcb.wake_at, tid);
    }
    state.total_retired_quanta += tcb.quanta_run;
    state.ids.release(tid);
    drop(tcb.take_stack());
}

fn abort_on_system_failure(err: ThreadError) -> ! {
    log::error!("system error: {err}");
    std::process::exit(1);
}

fn teardown_and_exit(code: i32) -> ! {
    timer::disarm();
    *STATE.lock() = None;
    std::process::exit(code);
}

pub(crate) fn init(quantum_usecs: i64) -> Result<(), ThreadError> {
    if quantum_usecs <= 0 {
        return Err(ThreadError::NonPositiveQuantum(quantum_usecs));
    }

    if STATE.lock().is_some() {
        return Err(ThreadError::AlreadyInitialized);
    }

    let mut threads: Vec<Option<Tcb>> = (0..MAX_THREAD_NUM).map(|_| None).collect();
    threads[0] = Some(Tcb::main_thread());

    let mut ids = IdAllocator::new();
    ids.alloc().expect("a fresh allocator always has id 0 available");

    let mut ready = ReadyQueue::new();
    ready.push_back(0);

    *STATE.lock() = Some(SchedulerState {
        threads,
        ready,
        sleeping: SleepIndex::new(),
        ids,
        quantum_usecs,
        total_quantums: 0,
        total_retired_quanta: 0,
        current_tid: 0,
        pending_teardown: None,
    });

    if let Err(err) = timer::install_handler(on_quantum_signal) {
        *STATE.lock() = None;
        return Err(err);
    }

    log::info!("thread library initialized, quantum = {quantum_usecs}us");

    // Dispatches the main thread through the ordinary scheduler path rather
    // than special-casing it: the first `save` captures the process's real
    // stack, the front of the (one-element) ready queue is picked again, and
    // the matching `jump` lands back on the `save` call site with
    // discriminator 1, so this call returns normally.
    run_scheduler(Mode::Tick, false);
    Ok(())
}

pub(crate) fn spawn(entry: ThreadEntry) -> Result<i32, ThreadError> {
    let _cs = timer::CriticalSection::enter();
    let mut guard = STATE.lock();
    let state = guard.as_mut().ok_or(ThreadError::NotInitialized)?;

    let id = state.ids.alloc()?;
    let stack = match Stack::new() {
        Ok(stack) => stack,
        Err(_) => {
            state.ids.release(id);
            drop(guard);
            drop(_cs);
            abort_on_system_failure(ThreadError::StackAllocationFailed(STACK_SIZE));
        }
    };

    state.threads[id as usize] = Some(Tcb::spawned(id, entry, stack, thread_trampoline));
    state.ready.push_back(id);
    log::debug!("spawned thread {id}");
    Ok(id)
}

pub(crate) fn terminate(tid: i32) -> Result<(), ThreadError> {
    let _cs = timer::CriticalSection::enter();

    let is_current = {
        let mut guard = STATE.lock();
        let state = guard.as_mut().ok_or(ThreadError::NotInitialized)?;
        validate_tid(state, tid)?;

        if tid == 0 {
            log::info!("terminate(0) requested, tearing down the library");
            drop(guard);
            drop(_cs);
            teardown_and_exit(0);
        }

        let is_current = state.current_tid == tid;
        if !is_current {
            purge_thread(state, tid);
            log::debug!("terminated thread {tid}");
        }
        is_current
    };

    if is_current {
        log::debug!("thread {tid} terminating itself");
        drop(_cs);
        run_scheduler(Mode::TerminateSelf, false);
        unreachable!("a self-terminating thread never returns from run_scheduler");
    }

    Ok(())
}

pub(crate) fn block(tid: i32) -> Result<(), ThreadError> {
    let _cs = timer::CriticalSection::enter();
    let mut guard = STATE.lock();
    let state = guard.as_mut().ok_or(ThreadError::NotInitialized)?;
    validate_tid(state, tid)?;
    if tid == 0 {
        return Err(ThreadError::MainThreadDisallowed);
    }

    let is_current = state.current_tid == tid;
    let tcb = state.threads[tid as usize].as_mut().unwrap();
    match tcb.state {
        ThreadState::Sleeping => tcb.sleep_blocked = true,
        ThreadState::Ready => {
            state.ready.remove(tid);
            tcb.state = ThreadState::Blocked;
        }
        ThreadState::Running => tcb.state = ThreadState::Blocked,
        ThreadState::Blocked => {}
    }
    log::debug!("blocked thread {tid}");

    if is_current {
        drop(guard);
        drop(_cs);
        run_scheduler(Mode::YieldBlocked, false);
    }

    Ok(())
}

pub(crate) fn resume(tid: i32) -> Result<(), ThreadError> {
    let _cs = timer::CriticalSection::enter();
    let mut guard = STATE.lock();
    let state = guard.as_mut().ok_or(ThreadError::NotInitialized)?;
    validate_tid(state, tid)?;

    let tcb = state.threads[tid as usize].as_mut().unwrap();
    match tcb.state {
        ThreadState::Blocked => {
            tcb.state = ThreadState::Ready;
            state.ready.push_back(tid);
            log::debug!("resumed thread {tid}");
        }
        ThreadState::Sleeping => tcb.sleep_blocked = false,
        ThreadState::Ready | ThreadState::Running => {}
    }
    Ok(())
}

pub(crate) fn sleep(num_quantums: i64) -> Result<(), ThreadError> {
    if num_quantums < 0 {
        return Err(ThreadError::NegativeSleepDuration(num_quantums));
    }

    let _cs = timer::CriticalSection::enter();
    {
        let mut guard = STATE.lock();
        let state = guard.as_mut().ok_or(ThreadError::NotInitialized)?;
        let tid = state.current_tid;
        if tid == 0 {
            return Err(ThreadError::MainThreadDisallowed);
        }

        let wake_at = state.total_quantums + num_quantums;
        let tcb = state.threads[tid as usize].as_mut().unwrap();
        tcb.state = ThreadState::Sleeping;
        tcb.sleep_blocked = false;
        tcb.wake_at = wake_at;
        state.sleeping.insert(wake_at, tid);
        log::debug!("thread {tid} sleeping until quantum {wake_at}");
    }

    drop(_cs);
    run_scheduler(Mode::YieldBlocked, false);
    Ok(())
}

pub(crate) fn get_tid() -> Result<i32, ThreadError> {
    let guard = STATE.lock();
    let state = guard.as_ref().ok_or(ThreadError::NotInitialized)?;
    Ok(state.current_tid)
}

pub(crate) fn get_total_quantums() -> Result<i64, ThreadError> {
    let guard = STATE.lock();
    let state = guard.as_ref().ok_or(ThreadError::NotInitialized)?;
    Ok(state.total_quantums)
}

pub(crate) fn get_quantums(tid: i32) -> Result<i64, ThreadError> {
    let guard = STATE.lock();
    let state = guard.as_ref().ok_or(ThreadError::NotInitialized)?;
    validate_tid(state, tid)?;
    Ok(state.threads[tid as usize].as_ref().unwrap().quanta_run)
}

/// Runs one pass of the scheduler: sweep sleepers due this quantum, dispatch
/// the current thread out (or destroy it), and switch to whoever is next.
///
/// Called both synchronously, from the public API functions above, and
/// asynchronously, from [`on_quantum_signal`] running as the `SIGVTALRM`
/// handler — the two cases are indistinguishable once inside here, which is
/// the point of masking the signal around every other access to the state
/// behind [`STATE`].
fn run_scheduler(mode: Mode, allow_fast_path: bool) {
    let cs = timer::CriticalSection::enter();
    timer::disarm();

    let quantum_usecs = {
        let mut guard = STATE.lock();
        let state = guard.as_mut().expect("run_scheduler requires an initialized scheduler");
        state.wake_sweep();
        state.quantum_usecs
    };

    // Spec §4.6's single-runnable-thread fast path: skip the save/jump
    // round trip entirely when a tick has nobody else to switch to.
    if mode == Mode::Tick && allow_fast_path {
        let mut guard = STATE.lock();
        let state = guard.as_mut().unwrap();
        if state.ready.len() == 1 {
            state.total_quantums += 1;
            let id = state.ready.front().unwrap();
            state.threads[id as usize].as_mut().unwrap().quanta_run += 1;
            drop(guard);
            let _ = timer::arm(quantum_usecs);
            drop(cs);
            return;
        }
    }

    if mode != Mode::TerminateSelf {
        let current_ctx: *mut Context = {
            let mut guard = STATE.lock();
            let state = guard.as_mut().unwrap();
            let front = state
                .ready
                .front()
                .expect("the ready queue is never empty while a thread is running");
            &mut state.threads[front as usize].as_mut().unwrap().context as *mut Context
        };

        // SAFETY: `current_ctx` points at the running thread's own TCB
        // context, and no lock is held across this call.
        let which = unsafe { arch::save(current_ctx) };
        if which == 1 {
            // We've been jumped back into: finish the other half of the
            // switch that dispatched us and return to our caller.
            after_switch();
            let _ = timer::arm(quantum_usecs);
            return;
        }

        let mut guard = STATE.lock();
        let state = guard.as_mut().unwrap();
        match mode {
            Mode::Tick => {
                let id = state.ready.pop_front().unwrap();
                state.ready.push_back(id);
            }
            Mode::YieldBlocked => {
                state.ready.pop_front();
            }
            Mode::TerminateSelf => unreachable!(),
        }
    } else {
        let mut guard = STATE.lock();
        let state = guard.as_mut().unwrap();
        let departing = state
            .ready
            .pop_front()
            .expect("the terminating thread is at the front of the ready queue");
        let mut tcb = state.threads[departing as usize].take().expect("the departing thread has a TCB");
        state.total_retired_quanta += tcb.quanta_run;
        state.ids.release(departing);
        state.pending_teardown = tcb.take_stack();
    }

    let next_ctx: *const Context = {
        let mut guard = STATE.lock();
        let state = guard.as_mut().unwrap();
        state.total_quantums += 1;
        let next_id = state.ready.front().expect("at least the main thread is always ready");
        let next = state.threads[next_id as usize].as_mut().unwrap();
        next.quanta_run += 1;
        next.state = ThreadState::Running;
        state.current_tid = next_id;
        log::trace!("dispatching thread {next_id} for quantum {}", state.total_quantums);
        &next.context as *const Context
    };

    let _ = timer::arm(quantum_usecs);
    drop(cs);
    // SAFETY: `next_ctx` was either captured by a prior `save` on this same
    // thread or synthesized by `Tcb::spawned`; either way it is live and
    // exclusively owned by the thread we're switching to.
    unsafe { arch::jump(next_ctx) }
}

/// Frees a departing thread's stack once the switch away from it has
/// actually landed — never while that thread might still be running on it.
fn after_switch() {
    let mut guard = STATE.lock();
    if let Some(state) = guard.as_mut() {
        if let Some(stack) = state.pending_teardown.take() {
            drop(stack);
        }
    }
}

/// The landing pad every freshly spawned thread's synthesized context jumps
/// to the first time it's dispatched (spec §4.4, §4.7).
extern "C" fn thread_trampoline() -> ! {
    after_switch();

    let (tid, entry) = {
        let guard = STATE.lock();
        let state = guard.as_ref().expect("the trampoline only runs with an active scheduler");
        let tid = state.current_tid;
        let entry = state.threads[tid as usize]
            .as_ref()
            .expect("the running thread has a TCB")
            .entry;
        (tid, entry)
    };

    entry();

    log::debug!("thread {tid} returned from its entry point; terminating it");
    let _ = terminate(tid);
    unreachable!("terminate(self) diverges into another thread's context instead of returning")
}

/// Installed as the `SIGVTALRM` disposition by [`init`].
extern "C" fn on_quantum_signal(_signum: libc::c_int) {
    run_scheduler(Mode::Tick, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn reset() {
        teardown_for_test();
    }

    fn teardown_for_test() {
        timer::disarm();
        *STATE.lock() = None;
    }

    #[test]
    #[serial]
    fn init_dispatches_the_main_thread_as_quantum_one() {
        reset();
        init(50_000).unwrap();
        assert_eq!(get_tid().unwrap(), 0);
        assert_eq!(get_total_quantums().unwrap(), 1);
        teardown_for_test();
    }

    #[test]
    #[serial]
    fn double_init_is_rejected() {
        reset();
        init(50_000).unwrap();
        assert!(matches!(init(50_000), Err(ThreadError::AlreadyInitialized)));
        teardown_for_test();
    }

    #[test]
    #[serial]
    fn spawn_before_init_reports_not_initialized() {
        reset();
        assert!(matches!(spawn(|| {}), Err(ThreadError::NotInitialized)));
    }

    #[test]
    #[serial]
    fn sleeping_the_main_thread_is_rejected() {
        reset();
        init(50_000).unwrap();
        assert!(matches!(sleep(1), Err(ThreadError::MainThreadDisallowed)));
        teardown_for_test();
    }

    #[test]
    #[serial]
    fn unknown_thread_ids_are_rejected() {
        reset();
        init(50_000).unwrap();
        assert!(matches!(block(17), Err(ThreadError::UnknownThread(17))));
        assert!(matches!(get_quantums(-3), Err(ThreadError::NegativeId(-3))));
        teardown_for_test();
    }
}
