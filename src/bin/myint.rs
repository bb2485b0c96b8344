/*
 * myint.rs - Signal disposition helper for the minsh integration tests
 *
 * usage: myint <n>
 * Sleeps for <n> seconds and sends SIGINT to itself. A foreground job dies
 * from it; a background job inherits SIGINT ignored and exits 0 instead.
 */

use clap::Parser;
use nix::sys::signal::{self, Signal};
use nix::unistd;
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
struct Args {
    /// Seconds to sleep before the signal
    secs: u64,
}

fn main() {
    let args = Args::parse();
    thread::sleep(Duration::from_secs(args.secs));

    if let Err(err) = signal::kill(unistd::getpid(), Signal::SIGINT) {
        eprintln!("kill (int) error: {}", err);
        process::exit(1);
    }
}
