use crate::exec::ExitStatus;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::{debug, warn};

/// A background child the shell has not reaped yet.
#[derive(Debug)]
pub struct BackgroundJob {
    pub pid: Pid,
    pub program: String,
}

/// Manages the running background jobs using a HashMap keyed by process ID.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: HashMap<Pid, BackgroundJob>,
}

impl JobList {
    /// Creates a new, empty job list.
    pub fn new() -> Self {
        JobList {
            jobs: HashMap::new(),
        }
    }

    /// Adds a new background job. Returns false for a non-positive pid.
    pub fn add_job(&mut self, pid: Pid, program: &str) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        debug!(%pid, program, "tracking background job");
        self.jobs.insert(
            pid,
            BackgroundJob {
                pid,
                program: program.to_string(),
            },
        );
        true
    }

    /// Deletes the job with the given pid from the job list.
    pub fn delete_job(&mut self, pid: Pid) -> Option<BackgroundJob> {
        self.jobs.remove(&pid)
    }

    #[cfg(test)]
    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Polls every job without blocking. Jobs that exited or were killed are
    /// removed and returned; the rest stay tracked.
    pub fn reap_finished(&mut self) -> Vec<(Pid, ExitStatus)> {
        let mut finished = Vec::new();
        if self.is_empty() {
            return finished;
        }
        let pids: Vec<Pid> = self.jobs.keys().copied().collect();
        for pid in pids {
            match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(status) => {
                    if let Some(status) = ExitStatus::from_wait(status) {
                        if let Some(job) = self.delete_job(pid) {
                            debug!(%pid, program = %job.program, %status, "background job done");
                        }
                        finished.push((pid, status));
                    }
                }
                Err(Errno::ECHILD) => {
                    warn!(%pid, "background job is no longer a child; dropping it");
                    self.delete_job(pid);
                }
                Err(err) => warn!(%pid, "waitpid failed: {}", err),
            }
        }
        finished
    }

    /// Kills every tracked job with SIGKILL and waits for each one.
    /// Returns how many jobs were terminated.
    pub fn kill_all(&mut self) -> usize {
        let count = self.len();
        for (_, job) in self.jobs.drain() {
            let pid = job.pid;
            debug!(%pid, program = %job.program, "killing background job");
            if let Err(err) = signal::kill(pid, Signal::SIGKILL) {
                warn!(%pid, "kill failed: {}", err);
            }
            loop {
                match wait::waitpid(pid, None) {
                    Err(Errno::EINTR) => continue,
                    Err(err) => {
                        warn!(%pid, "waitpid failed: {}", err);
                        break;
                    }
                    Ok(status) if ExitStatus::from_wait(status).is_some() => break,
                    Ok(_) => continue,
                }
            }
        }
        count
    }
}

/// Prints the line announcing a reaped background job.
pub fn report_finished<W: Write>(out: &mut W, pid: Pid, status: ExitStatus) -> io::Result<()> {
    writeln!(out, "background pid {} is done: {}", pid, status)
}
