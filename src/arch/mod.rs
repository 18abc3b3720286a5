//! The context-switch primitive (spec §4.4, component C5).
//!
//! `uthreads` is deliberately single-architecture, the way `aticu-VeOS`'s
//! own `arch::x86_64` module is: a context switch is inherently an ABI- and
//! libc-specific operation, and pretending otherwise would just mean an
//! untested, unreachable code path for every other target.

#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
compile_error!(
    "uthreads' context-switch primitive is implemented against the glibc \
     x86_64 sigjmp_buf layout; this crate only supports x86_64 Linux."
);

mod x86_64;

pub use self::x86_64::{jump, save, Context};
