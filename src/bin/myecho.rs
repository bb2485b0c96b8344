/*
 * myecho.rs - Redirection helper for the minsh integration tests
 *
 * usage: myecho
 * Writes a fixed line to standard output and exits 0.
 */

use std::io::{self, Write};
use std::process;

const MESSAGE: &[u8] = b"myecho: known bytes \x01\x02\n";

fn main() {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout.write_all(MESSAGE).and_then(|_| stdout.flush()) {
        eprintln!("write error: {}", err);
        process::exit(1);
    }
}
