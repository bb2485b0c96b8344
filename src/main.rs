mod builtins;
mod error;
mod exec;
mod jobs;
mod parser;
mod shell;
mod signals;

use clap::Parser;
use shell::ShellConfig;
use std::process;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// A small shell with background jobs and a foreground-only toggle (Ctrl-Z).
#[derive(Debug, Parser)]
#[command(name = "minsh", version)]
struct Args {
    /// Print additional diagnostic information
    #[arg(short, long)]
    verbose: bool,

    /// Do not print a command prompt
    #[arg(short = 'p', long = "no-prompt")]
    no_prompt: bool,
}

impl From<Args> for ShellConfig {
    fn from(args: Args) -> Self {
        ShellConfig {
            emit_prompt: !args.no_prompt,
            verbose: args.verbose,
        }
    }
}

fn init_logging(config: &ShellConfig) {
    let level = if config.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .init();
}

fn main() {
    let config = ShellConfig::from(Args::parse());
    init_logging(&config);

    if let Err(err) = shell::run_interactive(&config) {
        error!("{}", err);
        process::exit(1);
    }
}
