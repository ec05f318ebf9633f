//! Cooperative cancellation for runs and sequences.
//!
//! A `CancelToken` is a shared flag. Tokens created with
//! [`CancelToken::watching_interrupts`] also observe the process-wide SIGINT
//! flag set by [`install_interrupt_handler`], which also terminates the
//! trainer registered through [`ActiveChild`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Set by the SIGINT handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    watch_interrupts: bool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also tripped by Ctrl-C once the handler is installed.
    pub fn watching_interrupts() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            watch_interrupts: true,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.watch_interrupts && INTERRUPTED.load(Ordering::SeqCst))
    }

    /// Clear the flag so the token can guard the next operation.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
        if self.watch_interrupts {
            INTERRUPTED.store(false, Ordering::SeqCst);
        }
    }
}

/// Process group of the trainer currently running, 0 when none.
static ACTIVE_CHILD: AtomicI32 = AtomicI32::new(0);

/// Records the running trainer so an interrupt can terminate it.
///
/// The child must lead its own process group. The slot is cleared on drop,
/// which must happen only after the child has been reaped.
#[derive(Debug)]
pub struct ActiveChild {
    pid: i32,
}

impl ActiveChild {
    pub fn register(pid: u32) -> Self {
        let pid = i32::try_from(pid).unwrap_or(0);
        ACTIVE_CHILD.store(pid, Ordering::SeqCst);
        ActiveChild { pid }
    }

    /// Send SIGTERM to the child's whole process group.
    pub fn terminate_group(&self) {
        signal_group(self.pid, TERMINATE);
    }
}

impl Drop for ActiveChild {
    fn drop(&mut self) {
        let _ = ACTIVE_CHILD.compare_exchange(self.pid, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

#[cfg(unix)]
const TERMINATE: i32 = libc::SIGTERM;
#[cfg(not(unix))]
const TERMINATE: i32 = 15;

#[cfg(unix)]
fn signal_group(pid: i32, sig: libc::c_int) {
    if pid > 0 {
        // SAFETY: kill(2) takes plain integers and is async-signal-safe; a
        // stale or reused group id only yields ESRCH/EPERM, which is ignored.
        unsafe {
            libc::kill(-pid, sig);
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: i32, _sig: i32) {}

/// Install a SIGINT handler that records the interrupt and terminates the
/// registered trainer.
///
/// The first SIGINT sets the flag and sends SIGTERM to the trainer's process
/// group, which closes its stdout and unblocks the runner. A second SIGINT
/// arriving before the flag is cleared sends SIGKILL to the group and exits
/// with status 130. The handler only touches atomics, `kill` and `_exit`.
#[cfg(unix)]
pub fn install_interrupt_handler() {
    // SAFETY: `sa` is fully initialized (zeroed, then mask emptied) before
    // being passed to sigaction, and the handler only calls
    // async-signal-safe functions.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigint_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigint_handler(_sig: libc::c_int) {
    let pid = ACTIVE_CHILD.load(Ordering::SeqCst);
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        signal_group(pid, libc::SIGKILL);
        // SAFETY: _exit is async-signal-safe and skips non-reentrant cleanup.
        unsafe { libc::_exit(130) };
    }
    signal_group(pid, libc::SIGTERM);
}

/// No-op on non-Unix; Ctrl-C keeps its default behavior there.
#[cfg(not(unix))]
pub fn install_interrupt_handler() {}
