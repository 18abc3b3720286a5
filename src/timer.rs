//! The quantum timer and the signal-mask critical-section discipline
//! (spec §4.5, §5, component C6).

use std::mem::MaybeUninit;

use crate::error::ThreadError;

/// Returns a `sigset_t` containing only `SIGVTALRM`.
fn quantum_signal_set() -> libc::sigset_t {
    unsafe {
        let mut set: libc::sigset_t = MaybeUninit::zeroed().assume_init();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGVTALRM);
        set
    }
}

/// An RAII guard for a signal-masked critical section (spec §5).
///
/// Masking `SIGVTALRM` on construction and restoring the prior mask on
/// `Drop` gives every public API entry point and the scheduler the "mask on
/// entry, unmask on exit" discipline §5 requires, including on early-return
/// error paths, for free. The scheduler itself needs to unmask *before* a
/// [`crate::arch::jump`] that never returns to run the destructor, so it
/// drops this guard explicitly at that point rather than letting scope-exit
/// do it (spec §4.6 step 9).
pub struct CriticalSection {
    previous_mask: libc::sigset_t,
}

impl CriticalSection {
    /// Blocks `SIGVTALRM`, remembering whatever mask was in effect so it can
    /// be restored exactly, even if this call nests inside another masked
    /// section (e.g. a public API call invoking the scheduler).
    pub fn enter() -> CriticalSection {
        let block_set = quantum_signal_set();
        let mut previous_mask = unsafe { MaybeUninit::zeroed().assume_init() };
        unsafe {
            libc::sigprocmask(libc::SIG_BLOCK, &block_set, &mut previous_mask);
        }
        CriticalSection { previous_mask }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        unsafe {
            libc::sigprocmask(libc::SIG_SETMASK, &self.previous_mask, std::ptr::null_mut());
        }
    }
}

/// Disarms the quantum timer (spec §4.5: "stopped at the entry of every
/// critical section").
pub fn disarm() {
    let zero = libc::itimerval {
        it_interval: libc::timeval { tv_sec: 0, tv_usec: 0 },
        it_value: libc::timeval { tv_sec: 0, tv_usec: 0 },
    };
    unsafe {
        libc::setitimer(libc::ITIMER_VIRTUAL, &zero, std::ptr::null_mut());
    }
}

/// Arms the quantum timer to fire once, and then repeatedly, every
/// `quantum_usecs` microseconds of virtual CPU time.
pub fn arm(quantum_usecs: i64) -> Result<(), ThreadError> {
    const USECS_PER_SEC: i64 = 1_000_000;
    let interval = libc::timeval {
        tv_sec: (quantum_usecs / USECS_PER_SEC) as libc::time_t,
        tv_usec: (quantum_usecs % USECS_PER_SEC) as libc::suseconds_t,
    };
    let timer = libc::itimerval {
        it_interval: interval,
        it_value: interval,
    };
    let result = unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, std::ptr::null_mut()) };
    if result == -1 {
        return Err(ThreadError::SetitimerFailed(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Installs `handler` as the `SIGVTALRM` disposition (spec §4.5, §4.7's
/// `init`). Installing it a second time without a teardown is not
/// supported (spec §5, "Resource policy").
pub fn install_handler(handler: extern "C" fn(libc::c_int)) -> Result<(), ThreadError> {
    let mut action: libc::sigaction = unsafe { MaybeUninit::zeroed().assume_init() };
    action.sa_sigaction = handler as usize;
    unsafe {
        libc::sigemptyset(&mut action.sa_mask);
    }
    action.sa_flags = 0;

    let result = unsafe { libc::sigaction(libc::SIGVTALRM, &action, std::ptr::null_mut()) };
    if result == -1 {
        return Err(ThreadError::SigactionFailed(std::io::Error::last_os_error()));
    }
    Ok(())
}
