use crate::error::ShellError;
use nix::unistd;
use std::fmt;

/// The token that expands to the shell's own process ID.
pub const PID_MARKER: &str = "$$";

/// Which standard stream a `<` or `>` operator replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Input,
    Output,
}

impl Redirect {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Redirect::Input),
            ">" => Some(Redirect::Output),
            _ => None,
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Redirect::Input => f.write_str("<"),
            Redirect::Output => f.write_str(">"),
        }
    }
}

/// Represents a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Name of the built-in or executable. Never empty.
    pub program: String,
    /// Positional arguments, not including the program name.
    pub args: Vec<String>,
    /// Input redirection file, if any.
    pub infile: Option<String>,
    /// Output redirection file, if any.
    pub outfile: Option<String>,
    /// Run without waiting. Always false in foreground-only mode.
    pub background: bool,
}

impl Command {
    /// Creates a foreground command with no arguments or redirections.
    pub fn new(program: impl Into<String>) -> Self {
        Command {
            program: program.into(),
            args: Vec::new(),
            infile: None,
            outfile: None,
            background: false,
        }
    }

    /// The program name followed by its arguments, in exec order.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

/// The result of parsing one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Command(Command),
    /// The first token starts with `#`.
    Comment,
    /// Nothing but spaces.
    Blank,
}

/// Parses one input line (without its trailing newline) into a [`ParsedLine`].
///
/// The line goes through three stages:
///
/// - `$$` expansion to the shell's PID (see [`expand_pid`])
/// - splitting on spaces (see [`tokenize`])
/// - structuring into `command [args...] [< infile] [> outfile] [&]`
///
/// A trailing `&` marks the command as background unless `foreground_only`
/// is set. When a redirection operator appears more than once the last one
/// wins. A redirection operator without a following file name yields
/// [`ShellError::MalformedRedirect`].
pub fn parse_command_line(cmdline: &str, foreground_only: bool) -> Result<ParsedLine, ShellError> {
    let expanded = expand_pid(cmdline, &unistd::getpid().to_string());
    let tokens = tokenize(&expanded);

    let Some((&program, rest)) = tokens.split_first() else {
        return Ok(ParsedLine::Blank);
    };
    if program.starts_with('#') {
        return Ok(ParsedLine::Comment);
    }

    let mut command = Command::new(program);
    let arg_end = rest.iter().position(|t| is_operator(t)).unwrap_or(rest.len());
    command.args = rest[..arg_end].iter().map(|t| t.to_string()).collect();
    command.background = !foreground_only && rest.last() == Some(&"&");

    let mut iter = rest[arg_end..].iter();
    while let Some(token) = iter.next() {
        let Some(redirect) = Redirect::from_token(token) else {
            continue;
        };
        let file = match iter.next() {
            Some(file) if !is_operator(file) => file.to_string(),
            _ => return Err(ShellError::MalformedRedirect(redirect)),
        };
        match redirect {
            Redirect::Input => command.infile = Some(file),
            Redirect::Output => command.outfile = Some(file),
        }
    }
    Ok(ParsedLine::Command(command))
}

/// Replaces every `$$` with `pid`, pairing markers greedily from the left so
/// an odd run of `$` keeps its final `$`.
pub fn expand_pid(line: &str, pid: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(at) = rest.find(PID_MARKER) {
        expanded.push_str(&rest[..at]);
        expanded.push_str(pid);
        rest = &rest[at + PID_MARKER.len()..];
    }
    expanded.push_str(rest);
    expanded
}

/// Splits a line on single spaces. Runs of spaces collapse, tabs are ordinary
/// characters and there is no quoting.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').filter(|t| !t.is_empty()).collect()
}

fn is_operator(token: &str) -> bool {
    matches!(token, "<" | ">" | "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Command {
        match parse_command_line(input, false).unwrap() {
            ParsedLine::Command(cmd) => cmd,
            other => panic!("expected a command, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(tokenize("ls -l"), vec!["ls", "-l"]);
    }

    #[test]
    fn test_tokenize_collapses_spaces_only() {
        assert_eq!(tokenize("  echo   a\tb "), vec!["echo", "a\tb"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_expand_pid() {
        assert_eq!(expand_pid("echo $$", "1234"), "echo 1234");
        assert_eq!(expand_pid("$$$", "7"), "7$");
        assert_eq!(expand_pid("$$$$", "7"), "77");
        assert_eq!(expand_pid("a$b$", "7"), "a$b$");
        assert_eq!(expand_pid("x$$y$$", "42"), "x42y42");
    }

    #[test]
    fn test_parse_expands_own_pid() {
        let cmd = parse("echo $$");
        assert_eq!(cmd.args, vec![std::process::id().to_string()]);
    }

    #[test]
    fn test_parse_command_line() {
        let cmd = parse("wc -l < input.txt > output.txt &");
        assert_eq!(cmd.program, "wc");
        assert_eq!(cmd.args, vec!["-l"]);
        assert_eq!(cmd.infile.as_deref(), Some("input.txt"));
        assert_eq!(cmd.outfile.as_deref(), Some("output.txt"));
        assert!(cmd.background);
        assert_eq!(cmd.argv().collect::<Vec<_>>(), vec!["wc", "-l"]);
    }

    #[test]
    fn test_redirect_order_is_free() {
        let cmd = parse("sort > out < in");
        assert_eq!(cmd.infile.as_deref(), Some("in"));
        assert_eq!(cmd.outfile.as_deref(), Some("out"));
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_last_redirect_wins() {
        let cmd = parse("cat < a < b > c > d");
        assert_eq!(cmd.infile.as_deref(), Some("b"));
        assert_eq!(cmd.outfile.as_deref(), Some("d"));
    }

    #[test]
    fn test_ampersand_only_counts_when_last() {
        let cmd = parse("echo a & b");
        assert_eq!(cmd.args, vec!["a"]);
        assert!(!cmd.background);
    }

    #[test]
    fn test_foreground_only_ignores_ampersand() {
        let parsed = parse_command_line("sleep 5 &", true).unwrap();
        let ParsedLine::Command(cmd) = parsed else {
            panic!("expected a command");
        };
        assert_eq!(cmd.args, vec!["5"]);
        assert!(!cmd.background);
    }

    #[test]
    fn test_comment_and_blank() {
        assert_eq!(parse_command_line("# comment", false).unwrap(), ParsedLine::Comment);
        assert_eq!(parse_command_line("#", false).unwrap(), ParsedLine::Comment);
        assert_eq!(parse_command_line("    ", false).unwrap(), ParsedLine::Blank);
        // Only a leading `#` starts a comment.
        assert_eq!(parse("echo #x").args, vec!["#x"]);
    }

    #[test]
    fn test_malformed_redirect() {
        assert!(matches!(
            parse_command_line("cat <", false),
            Err(ShellError::MalformedRedirect(Redirect::Input))
        ));
        assert!(matches!(
            parse_command_line("ls > &", false),
            Err(ShellError::MalformedRedirect(Redirect::Output))
        ));
    }
}
