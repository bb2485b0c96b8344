use crate::builtins::{handle_builtin, BuiltinOutcome};
use crate::error::ShellError;
use crate::exec::{execute_command, ExitStatus, Launch};
use crate::jobs::{report_finished, JobList};
use crate::parser::{parse_command_line, ParsedLine};
use crate::signals;
use std::io::{self, BufRead, Write};
use tracing::{debug, error, warn};

/// Global prompt string.
pub static PROMPT: &str = ": ";

/// Options the shell was started with.
#[derive(Debug, Clone, Copy)]
pub struct ShellConfig {
    /// Print the prompt before reading each line.
    pub emit_prompt: bool,
    /// Log debug information to standard error.
    pub verbose: bool,
}

/// State that outlives a single command.
#[derive(Debug, Default)]
pub struct ShellState {
    pub jobs: JobList,
    /// Outcome of the most recent foreground external command.
    pub last_status: ExitStatus,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs the main shell loop: reaps finished background jobs, prints the
/// prompt (if enabled), reads a line, parses it and evaluates the command.
///
/// Returns on end-of-input or `exit`, after killing and reaping every
/// background job that is still running.
pub fn run_shell<R: BufRead, W: Write>(
    mut input: R,
    mut out: W,
    config: &ShellConfig,
) -> Result<(), ShellError> {
    signals::set_reprompt(config.emit_prompt);
    signals::parent_disposition()?;

    let mut state = ShellState::new();
    let result = read_eval_loop(&mut input, &mut out, &mut state, config);

    let killed = state.jobs.kill_all();
    if killed > 0 {
        debug!(killed, "terminated background jobs on exit");
    }
    out.flush()?;
    result
}

fn read_eval_loop<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    state: &mut ShellState,
    config: &ShellConfig,
) -> Result<(), ShellError> {
    loop {
        for (pid, status) in state.jobs.reap_finished() {
            report_finished(out, pid, status)?;
        }

        if config.emit_prompt {
            write!(out, "{}", PROMPT)?;
        }
        out.flush()?;

        let Some(cmdline) = read_line(input) else {
            debug!("end of input");
            return Ok(());
        };
        if cmdline.is_empty() {
            continue;
        }

        let cmd = match parse_command_line(&cmdline, signals::foreground_only()) {
            Ok(ParsedLine::Command(cmd)) => cmd,
            Ok(ParsedLine::Comment) | Ok(ParsedLine::Blank) => continue,
            Err(err) => {
                warn!("parse error: {}", err);
                continue;
            }
        };
        debug!(?cmd, "parsed command");

        match handle_builtin(&cmd, state, out)? {
            BuiltinOutcome::Exit => return Ok(()),
            BuiltinOutcome::Handled => {}
            BuiltinOutcome::NotBuiltin => match execute_command(&cmd, &mut state.jobs, out) {
                Ok(Launch::Foreground(status)) => state.last_status = status,
                Ok(Launch::Background(pid)) => debug!(%pid, "launched in background"),
                Err(ShellError::Io(err)) => return Err(ShellError::Io(err)),
                Err(err) => {
                    error!(program = %cmd.program, "{}", err);
                    state.last_status = ExitStatus::Exited(1);
                }
            },
        }
        out.flush()?;
    }
}

/// Reads one line without its trailing newline. `None` at end of input; a
/// read error is logged and also ends the input.
fn read_line<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match input.read_until(b'\n', &mut buf) {
        Ok(0) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

/// Runs the shell on standard input and output.
pub fn run_interactive(config: &ShellConfig) -> Result<(), ShellError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_shell(stdin.lock(), stdout.lock(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Cursor;

    fn run(input: &str, emit_prompt: bool) -> String {
        let config = ShellConfig {
            emit_prompt,
            verbose: false,
        };
        let mut out = Vec::new();
        run_shell(Cursor::new(input.as_bytes()), &mut out, &config).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_new_state_is_clean() {
        let state = ShellState::new();
        assert_eq!(state.last_status, ExitStatus::Exited(0));
        assert!(state.jobs.is_empty());
        assert_eq!(ShellState::default().last_status, state.last_status);
    }

    #[test]
    #[serial]
    fn test_comment_prints_only_prompts() {
        assert_eq!(run("# comment\n", true), ": : ");
        assert_eq!(run("# comment\n", false), "");
    }

    #[test]
    #[serial]
    fn test_blank_lines_are_skipped() {
        assert_eq!(run("\n   \nstatus\n", false), "exit value 0\n");
    }

    #[test]
    #[serial]
    fn test_status_defaults_and_repeats() {
        assert_eq!(run("status\nstatus\n", false), "exit value 0\nexit value 0\n");
    }

    #[test]
    #[serial]
    fn test_cd_does_not_touch_status() {
        let cwd = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = format!("cd {}\nstatus\n", dir.path().display());
        let out = run(&input, false);
        env::set_current_dir(cwd).unwrap();
        assert_eq!(out, "exit value 0\n");
    }

    #[test]
    #[serial]
    fn test_malformed_redirect_returns_to_prompt() {
        assert_eq!(run("cat <\nstatus\n", true), ": : exit value 0\n: ");
    }

    #[test]
    #[serial]
    fn test_exit_stops_reading() {
        assert_eq!(run("exit\nstatus\n", false), "");
    }

    #[test]
    #[serial]
    fn test_foreground_status_is_recorded() {
        assert_eq!(run("false\nstatus\ntrue\nstatus\n", false), "exit value 1\nexit value 0\n");
    }

    #[test]
    #[serial]
    fn test_missing_line_terminator() {
        assert_eq!(run("status", false), "exit value 0\n");
    }
}
