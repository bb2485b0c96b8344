/*
 * myspin.rs - Background job helper for the minsh integration tests
 *
 * usage: myspin <n>
 * Sleeps for <n> seconds, one second at a time, then exits 0.
 */

use clap::Parser;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
struct Args {
    /// Seconds to sleep
    secs: u64,
}

fn main() {
    let args = Args::parse();
    for _ in 0..args.secs {
        thread::sleep(Duration::from_secs(1));
    }
}
