use crate::error::ShellError;
use crate::shell::PROMPT;
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;
use once_cell::sync::OnceCell;
use signal_hook::consts::signal::SIGTSTP;
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};

const ENTER_FOREGROUND_ONLY: &str = "\nEntering foreground-only mode (& is now ignored)\n";
const EXIT_FOREGROUND_ONLY: &str = "\nExiting foreground-only mode\n";

/// Set while `&` is ignored. Only the SIGTSTP handler writes it.
static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Whether the handler should print the prompt again after its notice.
static REPROMPT: AtomicBool = AtomicBool::new(false);

static TOGGLE_HANDLER: OnceCell<SigId> = OnceCell::new();

/// Returns true while the shell is in foreground-only mode.
pub fn foreground_only() -> bool {
    FOREGROUND_ONLY.load(Ordering::SeqCst)
}

/// Controls whether the toggle notice is followed by a fresh prompt.
pub fn set_reprompt(enabled: bool) {
    REPROMPT.store(enabled, Ordering::SeqCst);
}

/// Runs inside the SIGTSTP handler: only atomics and raw `write(2)`.
fn toggle_foreground_only() {
    let was_on = FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
    let notice = if was_on {
        EXIT_FOREGROUND_ONLY
    } else {
        ENTER_FOREGROUND_ONLY
    };
    let _ = unistd::write(libc::STDOUT_FILENO, notice.as_bytes());
    if REPROMPT.load(Ordering::SeqCst) {
        let _ = unistd::write(libc::STDOUT_FILENO, PROMPT.as_bytes());
    }
}

/// Configures the shell's own process:
/// - SIGINT (Ctrl-C) is ignored.
/// - SIGTSTP (Ctrl-Z) toggles foreground-only mode.
///
/// Safe to call repeatedly; the SIGTSTP handler is registered only once.
/// signal-hook installs it with `SA_RESTART`, so a blocked read or waitpid
/// resumes after a toggle.
pub fn parent_disposition() -> Result<(), ShellError> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe { signal::sigaction(Signal::SIGINT, &ignore) }.map_err(ShellError::SignalSetup)?;

    TOGGLE_HANDLER
        .get_or_try_init(|| unsafe {
            signal_hook::low_level::register(SIGTSTP, toggle_foreground_only)
        })
        .map_err(ShellError::SignalRegister)?;
    Ok(())
}

/// Configures a freshly forked child before it execs. Ignored dispositions
/// survive `execvp`, so these are what the new program starts with:
/// - SIGTSTP is always ignored.
/// - SIGINT is default for foreground commands and ignored for background ones.
/// - SIGPIPE goes back to default; the Rust runtime starts the shell with it ignored.
///
/// Only calls `sigaction`, so it is safe between `fork` and `exec`.
pub fn child_disposition(background: bool) -> Result<(), ShellError> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    let sigint = if background { &ignore } else { &default };

    unsafe {
        signal::sigaction(Signal::SIGTSTP, &ignore).map_err(ShellError::SignalSetup)?;
        signal::sigaction(Signal::SIGINT, sigint).map_err(ShellError::SignalSetup)?;
        signal::sigaction(Signal::SIGPIPE, &default).map_err(ShellError::SignalSetup)?;
    }
    Ok(())
}
