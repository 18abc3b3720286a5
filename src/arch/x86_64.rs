//! x86_64/glibc implementation of the context-switch primitive.
//!
//! Grounded directly in `examples/original_source/src/Thread.cpp`: the
//! original saves/restores execution state with `sigsetjmp`/`siglongjmp`,
//! writing the synthesized stack pointer and program counter straight into
//! `env->__jmpbuf[JB_SP]`/`[JB_PC]` after applying the same xor/rotate
//! pointer mangling glibc's own `setjmp`/`longjmp` apply (spec §4.4, §6,
//! §9). `libc` doesn't expose the `setjmp` family (mixing them with Rust's
//! unwinding model is delicate), so the two symbols are declared here
//! directly, and `SigJmpBuf` mirrors glibc's `__jmp_buf_tag` layout.

use std::mem::MaybeUninit;

/// Index of the saved stack pointer within `__jmpbuf` on x86_64 glibc.
const JB_SP: usize = 6;
/// Index of the saved program counter within `__jmpbuf` on x86_64 glibc.
const JB_PC: usize = 7;

/// Mirrors glibc's `struct __jmp_buf_tag` (the single element of a
/// `sigjmp_buf`) on x86_64: eight mangled `long`s, a flag recording whether
/// the signal mask was saved, and the saved mask itself.
#[repr(C)]
struct SigJmpBuf {
    jmpbuf: [i64; 8],
    mask_was_saved: libc::c_int,
    saved_mask: libc::sigset_t,
}

extern "C" {
    // The `sigsetjmp(env, savesigs)` macro glibc's headers expose lowers to
    // this symbol; we call it directly since there's no macro to invoke
    // from Rust.
    #[link_name = "__sigsetjmp"]
    fn sigsetjmp_raw(env: *mut SigJmpBuf, savesigs: libc::c_int) -> libc::c_int;

    fn siglongjmp(env: *mut SigJmpBuf, val: libc::c_int) -> !;
}

/// An opaque, captured-or-synthesized execution context (spec §3, the
/// `context` TCB attribute).
pub struct Context {
    buf: SigJmpBuf,
}

impl Context {
    /// A context with no captured state yet. Used for the main thread: its
    /// first `save` captures the process's real, already-running stack
    /// rather than jumping to a synthesized one (spec §4.7).
    pub fn zeroed() -> Context {
        Context {
            buf: SigJmpBuf {
                jmpbuf: [0; 8],
                mask_was_saved: 0,
                saved_mask: unsafe { MaybeUninit::zeroed().assume_init() },
            },
        }
    }

    /// Synthesizes a context that, once jumped to, begins executing
    /// `entry` atop `stack_pointer` (spec §4.4).
    ///
    /// Mirrors `Thread::Thread` in the original: prime a real `jmp_buf` via
    /// `sigsetjmp` (so the signal-mask bookkeeping fields are in whatever
    /// shape glibc expects), then overwrite the saved stack pointer and
    /// program counter with mangled values of our own choosing, and clear
    /// the saved mask so a restore doesn't reapply a stale one.
    pub fn synthesize(entry: extern "C" fn() -> !, stack_pointer: usize) -> Context {
        let mut ctx = Context::zeroed();
        unsafe {
            sigsetjmp_raw(&mut ctx.buf, 1);
            ctx.buf.jmpbuf[JB_SP] = mangle(stack_pointer as i64);
            ctx.buf.jmpbuf[JB_PC] = mangle(entry as usize as i64);
            libc::sigemptyset(&mut ctx.buf.saved_mask);
        }
        ctx
    }
}

/// Reproduces glibc x86_64's pointer-guard mangling of saved jump-buffer
/// values (`examples/original_source/src/Thread.cpp::translate_address`):
/// xor with the thread's stack guard (`%fs:0x30`), then rotate left by 17
/// bits. The same transform is its own inverse, which is why `synthesize`
/// and the real `sigsetjmp`/`siglongjmp` pair can both apply it without
/// needing a separate "unmangle" routine.
unsafe fn mangle(value: i64) -> i64 {
    let mut result = value;
    std::arch::asm!(
        "xor {0}, fs:0x30",
        "rol {0}, 0x11",
        inout(reg) result,
        options(nostack, preserves_flags),
    );
    result
}

/// Captures the calling thread's context into `ctx`.
///
/// Returns `0` on the direct call; if another thread later [`jump`]s back
/// into `ctx`, this same call site "returns again" with `1` (spec §4.4).
///
/// # Safety
/// `ctx` must point at a live `Context` belonging to the thread that is
/// calling this. The caller must not hold any lock across this call that a
/// subsequent [`jump`] elsewhere would need to reacquire: the time between
/// a `0` return and the matching `jump` may be arbitrarily long.
pub unsafe fn save(ctx: *mut Context) -> i32 {
    sigsetjmp_raw(&mut (*ctx).buf, 1)
}

/// Restores the context captured in `ctx`, transferring control to the
/// matching [`save`] call site with discriminator `1`. Never returns here.
///
/// # Safety
/// `ctx` must point at a `Context` previously populated by [`save`] or
/// [`Context::synthesize`], and the stack it describes must still be live
/// and exclusively owned by the thread being resumed.
pub unsafe fn jump(ctx: *const Context) -> ! {
    siglongjmp(&(*ctx).buf as *const SigJmpBuf as *mut SigJmpBuf, 1)
}
