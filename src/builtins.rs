use crate::error::ShellError;
use crate::parser::Command;
use crate::shell::ShellState;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// What the main loop should do after offering a command to the built-ins.
#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Not a built-in; run it as an external command.
    NotBuiltin,
    Handled,
    /// `exit` was entered.
    Exit,
}

/// Checks if the command is a built-in command and, if so, executes it.
/// Supported built-ins are "exit", "cd" and "status".
///
/// `cd` failures are logged and leave the status record alone, so `status`
/// always describes the last foreground external command.
pub fn handle_builtin<W: Write>(
    cmd: &Command,
    state: &mut ShellState,
    out: &mut W,
) -> io::Result<BuiltinOutcome> {
    match cmd.program.as_str() {
        "exit" => {
            if !cmd.args.is_empty() {
                debug!(args = ?cmd.args, "exit takes no arguments; ignoring them");
            }
            Ok(BuiltinOutcome::Exit)
        }
        "cd" => {
            let target = cmd.args.first().map(String::as_str);
            match change_directory(target, |key| env::var(key).ok()) {
                Ok(dir) => debug!(dir = %dir.display(), "changed directory"),
                Err(err) => warn!("{}", err),
            }
            Ok(BuiltinOutcome::Handled)
        }
        "status" => {
            writeln!(out, "{}", state.last_status)?;
            out.flush()?;
            Ok(BuiltinOutcome::Handled)
        }
        _ => Ok(BuiltinOutcome::NotBuiltin),
    }
}

/// Changes the working directory to `path`, or to `HOME` when no path is
/// given. `lookup` reads environment variables; when `HOME` is unset the
/// password database is consulted instead.
pub fn change_directory<F>(path: Option<&str>, lookup: F) -> Result<PathBuf, ShellError>
where
    F: Fn(&str) -> Option<String>,
{
    let dir = match path {
        Some(path) => PathBuf::from(path),
        None => lookup("HOME")
            .map(PathBuf::from)
            .or_else(dirs_next::home_dir)
            .ok_or(ShellError::NoHomeDirectory)?,
    };
    env::set_current_dir(&dir).map_err(|source| ShellError::ChangeDirectory {
        path: dir.display().to_string(),
        source,
    })?;
    Ok(dir)
}
