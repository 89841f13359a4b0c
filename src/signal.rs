//! Ctrl+C handling
//!
//! SIGINT only raises a stop flag; the monitor loop notices it on its next
//! iteration, closes the port through scope exit and prints the footer.

use std::sync::atomic::AtomicBool;
#[cfg(unix)]
use std::sync::atomic::Ordering;

#[cfg(unix)]
use anyhow::Context;

/// Raised when SIGINT is delivered
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    // Only async-signal-safe work here: a single atomic store
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT to [`STOP_REQUESTED`] instead of terminating the process
pub fn install_interrupt_handler() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let handler = handle_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only performs an atomic store
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err::<(), _>(std::io::Error::last_os_error())
                .context("Failed to set Ctrl+C handler");
        }
        log::debug!("SIGINT handler installed");
    }

    #[cfg(not(unix))]
    log::debug!("no interrupt handler on this platform");

    Ok(())
}
