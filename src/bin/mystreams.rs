/*
 * mystreams.rs - Writes to both standard streams, for testing redirection
 *
 * usage: mystreams <n>
 * Writes "out <i>" to stdout and "err <i>" to stderr for i in 1..=n,
 * alternating and flushing after every line.
 */

use std::env;
use std::io::{self, Write};
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <n>", args[0]);
        process::exit(0);
    }

    let count = args[1].parse::<u32>().unwrap_or_else(|_| {
        eprintln!("Error: <n> must be a positive integer");
        process::exit(1);
    });

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    for i in 1..=count {
        let _ = writeln!(stdout, "out {}", i);
        let _ = stdout.flush();
        let _ = writeln!(stderr, "err {}", i);
        let _ = stderr.flush();
    }
    process::exit(0);
}
