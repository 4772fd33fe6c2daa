// Scoped stdout capture
//
// Redirects the process-wide stdout into a pipe for the duration of one
// closure and collects everything written there. The previous stdout is
// restored on every exit path, panics included.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[cfg(unix)]
use std::io::{Read, Write};
#[cfg(unix)]
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
#[cfg(unix)]
use std::thread;
#[cfg(unix)]
use tracing::debug;

/// Errors surfaced by [`capture`]
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A capture is already installed. Stdout is one resource per
    /// process, so a nested or concurrent capture would cross-attribute
    /// output; the call is rejected instead.
    #[error("a stdout capture is already active")]
    AlreadyActive,
    /// Setting up the capture pipe or swapping it in as stdout failed
    #[error("failed to redirect stdout")]
    Redirect(#[source] io::Error),
    /// Captured bytes were lost on their way into or out of the pipe
    #[error("failed to collect captured output")]
    Drain(#[source] io::Error),
    /// The previous stdout could not be put back. The caller must
    /// treat this as fatal and stop running examples: stdout is in an
    /// unknown state.
    #[error("failed to restore stdout")]
    Restore(#[source] io::Error),
    /// Descriptor-level redirection is only implemented for Unix targets
    #[cfg(not(unix))]
    #[error("stdout capture is not supported on this platform")]
    Unsupported,
}

/// Set while a capture is installed anywhere in the process
static CAPTURE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Run `body` with stdout redirected into an in-memory buffer and return
/// its value together with everything it wrote.
///
/// The redirection covers the descriptor itself, so writes through
/// `println!`, `io::stdout()` and raw fd 1 are all collected. Anything
/// the body left buffered is flushed into the capture at teardown.
/// Bytes are decoded as UTF-8 with invalid sequences replaced; a silent
/// body yields an empty string.
///
/// The previous stdout is restored before this function returns, and
/// also while a panic from `body` unwinds. At most one capture can be
/// active per process; a second call while one is installed returns
/// [`CaptureError::AlreadyActive`] without running the closure.
pub fn capture<T>(body: impl FnOnce() -> T) -> Result<(T, String), CaptureError> {
    let _slot = CaptureSlot::acquire()?;
    capture_in_slot(body)
}

#[cfg(unix)]
fn capture_in_slot<T>(body: impl FnOnce() -> T) -> Result<(T, String), CaptureError> {
    let (reader, writer) = os_pipe::pipe().map_err(CaptureError::Redirect)?;

    // Drain in the background so a body writing more than the kernel
    // pipe buffer never blocks. The thread exits on EOF, which arrives
    // once the last write end (stdout itself, after the swap) is gone.
    let drain = thread::Builder::new()
        .name("stdout-capture".to_string())
        .spawn(move || {
            let mut reader = reader;
            let mut collected = Vec::new();
            reader.read_to_end(&mut collected).map(|_| collected)
        })
        .map_err(CaptureError::Redirect)?;

    let mut redirect = StdoutRedirect::install(writer).map_err(CaptureError::Redirect)?;

    let value = body();

    // Bytes the body left buffered belong to the capture; push them into
    // the pipe before the swap back. A lost flush is a collection
    // failure, not a restore failure: fd 1 still comes back first.
    let flushed = io::stdout().flush();

    redirect.restore().map_err(CaptureError::Restore)?;
    flushed.map_err(CaptureError::Drain)?;

    let collected = drain
        .join()
        .map_err(|_| CaptureError::Drain(io::Error::other("drain thread panicked")))?
        .map_err(CaptureError::Drain)?;

    debug!("Captured {} byte(s) of stdout", collected.len());
    Ok((value, String::from_utf8_lossy(&collected).into_owned()))
}

#[cfg(not(unix))]
fn capture_in_slot<T>(_body: impl FnOnce() -> T) -> Result<(T, String), CaptureError> {
    Err(CaptureError::Unsupported)
}

/// Claim on the process-wide capture slot, released on drop so the flag
/// clears on every exit path
struct CaptureSlot;

impl CaptureSlot {
    fn acquire() -> Result<Self, CaptureError> {
        if CAPTURE_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::AlreadyActive);
        }
        Ok(Self)
    }
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        CAPTURE_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Swapped-in stdout redirection holding the previous descriptor.
///
/// `restore` puts it back explicitly; `Drop` repeats the attempt so the
/// swap cannot outlive the guard even when the body panics.
#[cfg(unix)]
struct StdoutRedirect {
    saved: Option<OwnedFd>,
}

#[cfg(unix)]
impl StdoutRedirect {
    /// Save the current fd 1 and swap the pipe's write end in its place.
    ///
    /// Host-side bytes still buffered in the stdout handle belong to the
    /// old target, so they are flushed before the swap. The `writer`
    /// handle is consumed: after the swap fd 1 holds the only surviving
    /// write end, which makes restoration the drain thread's EOF signal.
    fn install(writer: os_pipe::PipeWriter) -> io::Result<Self> {
        io::stdout().flush()?;

        let saved = unsafe { libc::dup(libc::STDOUT_FILENO) };
        if saved < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: dup returned a fresh descriptor nothing else owns
        let saved = unsafe { OwnedFd::from_raw_fd(saved) };

        if unsafe { libc::dup2(writer.as_raw_fd(), libc::STDOUT_FILENO) } < 0 {
            return Err(io::Error::last_os_error());
        }
        drop(writer);

        Ok(Self { saved: Some(saved) })
    }

    /// Put the saved descriptor back as fd 1. Idempotent; the second
    /// caller (usually `Drop` after an explicit restore) is a no-op.
    fn restore(&mut self) -> io::Result<()> {
        let Some(saved) = &self.saved else {
            return Ok(());
        };
        if unsafe { libc::dup2(saved.as_raw_fd(), libc::STDOUT_FILENO) } < 0 {
            return Err(io::Error::last_os_error());
        }
        self.saved = None;
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for StdoutRedirect {
    fn drop(&mut self) {
        if self.saved.is_some() {
            // Unwind path; keep the body's buffered bytes in the capture
            // before the swap back, and the errors cannot go anywhere
            let _ = io::stdout().flush();
            let _ = self.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so nothing else races the process-wide flag
    #[test]
    fn test_capture_slot_is_exclusive_until_released() {
        let first = CaptureSlot::acquire();
        assert!(first.is_ok());

        let second = CaptureSlot::acquire();
        assert!(matches!(second, Err(CaptureError::AlreadyActive)));

        drop(first);
        let third = CaptureSlot::acquire();
        assert!(third.is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CaptureError::AlreadyActive.to_string(),
            "a stdout capture is already active"
        );
        assert_eq!(
            CaptureError::Restore(io::Error::other("nope")).to_string(),
            "failed to restore stdout"
        );
    }
}
