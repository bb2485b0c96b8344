use crate::error::ShellError;
use crate::jobs::JobList;
use crate::parser::{Command, Redirect};
use crate::signals;
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::fmt;
use std::io::Write;
use std::os::unix::io::RawFd;
use tracing::{debug, error};

const DEV_NULL: &CStr = c"/dev/null";

/// How a foreground program finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

impl ExitStatus {
    /// Decodes a terminal wait status. Stops, continues and "still alive"
    /// are not terminal and give `None`.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {}", code),
            ExitStatus::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

/// What happened to a launched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// The shell waited for it.
    Foreground(ExitStatus),
    /// It was added to the job list.
    Background(Pid),
}

/// A command converted to C strings in the parent, so the child does no
/// allocation between `fork` and `exec`. `argv_ptrs` points into `argv` and
/// ends with a null pointer, ready for `execvp(3)`.
struct ExecPlan {
    argv: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    infile: Option<CString>,
    outfile: Option<CString>,
    background: bool,
}

impl ExecPlan {
    fn new(cmd: &Command) -> Result<Self, ShellError> {
        let argv: Vec<CString> = cmd.argv().map(c_string).collect::<Result<_, _>>()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();
        Ok(ExecPlan {
            argv,
            argv_ptrs,
            infile: cmd.infile.as_deref().map(c_string).transpose()?,
            outfile: cmd.outfile.as_deref().map(c_string).transpose()?,
            background: cmd.background,
        })
    }
}

fn c_string(s: &str) -> Result<CString, ShellError> {
    CString::new(s).map_err(|_| ShellError::NulByte(s.to_string()))
}

/// Executes an external command:
/// - Forks a child process.
/// - In the child, sets signal dispositions, applies redirections and execs
///   the program. Background commands without a redirection get `/dev/null`.
/// - In the parent, waits for a foreground child, or records a background
///   child in `jobs` and prints its PID.
///
/// A foreground child killed by a signal is reported on `out` right away.
pub fn execute_command<W: Write>(
    cmd: &Command,
    jobs: &mut JobList,
    out: &mut W,
) -> Result<Launch, ShellError> {
    let plan = ExecPlan::new(cmd)?;

    // Anything still buffered would be written twice once the child exits.
    out.flush()?;

    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => {
            let err = match exec_child(&plan) {
                Ok(never) => match never {},
                Err(err) => err,
            };
            let _ = unistd::write(libc::STDERR_FILENO, err.child_diagnostic().as_bytes());
            unsafe { libc::_exit(1) }
        }
        Ok(ForkResult::Parent { child }) => {
            signals::parent_disposition()?;
            if plan.background {
                jobs.add_job(child, &cmd.program);
                writeln!(out, "Background pid is {}.", child)?;
                out.flush()?;
                Ok(Launch::Background(child))
            } else {
                let status = wait_foreground(child)?;
                debug!(pid = %child, program = %cmd.program, %status, "foreground job finished");
                if let ExitStatus::Signaled(_) = status {
                    writeln!(out, "{}", status)?;
                    out.flush()?;
                }
                Ok(Launch::Foreground(status))
            }
        }
        Err(err) => {
            error!(program = %cmd.program, "fork failed: {}", err);
            Err(ShellError::ProcessCreationFailed(err))
        }
    }
}

/// Child side of the fork. Only returns on failure.
fn exec_child(plan: &ExecPlan) -> Result<Infallible, ShellError> {
    signals::child_disposition(plan.background)?;

    match &plan.infile {
        Some(path) => redirect(path, Redirect::Input)?,
        None if plan.background => redirect(DEV_NULL, Redirect::Input)?,
        None => {}
    }
    match &plan.outfile {
        Some(path) => redirect(path, Redirect::Output)?,
        None if plan.background => redirect(DEV_NULL, Redirect::Output)?,
        None => {}
    }

    // nix's execvp collects its pointer array into a fresh Vec, so call
    // libc directly with the array built before the fork.
    unsafe { libc::execvp(plan.argv[0].as_ptr(), plan.argv_ptrs.as_ptr()) };
    Err(ShellError::ProgramReplaceFailed(Errno::last()))
}

/// Opens `path` and installs it as standard input or output.
fn redirect(path: &CStr, kind: Redirect) -> Result<(), ShellError> {
    let (flags, mode, target): (OFlag, Mode, RawFd) = match kind {
        Redirect::Input => (OFlag::O_RDONLY, Mode::empty(), libc::STDIN_FILENO),
        Redirect::Output => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::S_IRUSR | Mode::S_IWUSR,
            libc::STDOUT_FILENO,
        ),
    };
    let open_failed = |source| ShellError::RedirectOpenFailed { redirect: kind, source };

    let fd = fcntl::open(path, flags, mode).map_err(open_failed)?;
    if fd != target {
        unistd::dup2(fd, target).map_err(open_failed)?;
        let _ = unistd::close(fd);
    }
    Ok(())
}

/// Blocks until `pid` terminates.
fn wait_foreground(pid: Pid) -> Result<ExitStatus, ShellError> {
    loop {
        match wait::waitpid(pid, None) {
            Ok(status) => {
                if let Some(status) = ExitStatus::from_wait(status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(ShellError::WaitFailed(err)),
        }
    }
}
