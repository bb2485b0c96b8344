use std::io;

use thiserror::Error;

use crate::parser::Redirect;

/// Everything that can go wrong while reading, parsing or running a command.
///
/// None of these terminate the shell: the main loop logs them and returns to
/// the prompt. The child-side kinds (`RedirectOpenFailed`,
/// `ProgramReplaceFailed`) only ever exist inside a forked child, which turns
/// them into a fixed diagnostic and exit status 1. They carry no heap data so
/// the child can build them between `fork` and `exec`.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("missing file name after `{0}`")]
    MalformedRedirect(Redirect),
    #[error("cannot open file for `{redirect}`: {source}")]
    RedirectOpenFailed {
        redirect: Redirect,
        #[source]
        source: nix::Error,
    },
    #[error("cannot execute program: {0}")]
    ProgramReplaceFailed(#[source] nix::Error),
    #[error("fork failed: {0}")]
    ProcessCreationFailed(#[source] nix::Error),
    #[error("waitpid failed: {0}")]
    WaitFailed(#[source] nix::Error),
    #[error("sigaction failed: {0}")]
    SignalSetup(#[source] nix::Error),
    #[error("cannot register signal handler: {0}")]
    SignalRegister(#[source] io::Error),
    #[error("argument contains a NUL byte: {0:?}")]
    NulByte(String),
    #[error("HOME is not set and no home directory could be found")]
    NoHomeDirectory,
    #[error("cd: {path}: {source}")]
    ChangeDirectory {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Fixed text a forked child prints before exiting with status 1.
    pub fn child_diagnostic(&self) -> &'static str {
        match self {
            ShellError::RedirectOpenFailed {
                redirect: Redirect::Input,
                ..
            } => "Error: input file could not be opened\n",
            ShellError::RedirectOpenFailed {
                redirect: Redirect::Output,
                ..
            } => "Error: output file could not be opened\n",
            _ => "Error: command could not be processed\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_child_diagnostics() {
        let input = ShellError::RedirectOpenFailed {
            redirect: Redirect::Input,
            source: Errno::ENOENT,
        };
        let output = ShellError::RedirectOpenFailed {
            redirect: Redirect::Output,
            source: Errno::EACCES,
        };
        assert_eq!(input.child_diagnostic(), "Error: input file could not be opened\n");
        assert_eq!(output.child_diagnostic(), "Error: output file could not be opened\n");
        assert_eq!(
            ShellError::ProgramReplaceFailed(Errno::ENOENT).child_diagnostic(),
            "Error: command could not be processed\n"
        );
    }

    #[test]
    fn test_redirect_messages_name_the_operator() {
        assert_eq!(
            ShellError::MalformedRedirect(Redirect::Output).to_string(),
            "missing file name after `>`"
        );
        let err = ShellError::RedirectOpenFailed {
            redirect: Redirect::Input,
            source: Errno::ENOENT,
        };
        assert!(err.to_string().starts_with("cannot open file for `<`: "));
    }
}
