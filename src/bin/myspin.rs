/*
 * myspin.rs - A handy program for testing background pipelines
 *
 * usage: myspin <n> [message]
 * Sleeps for <n> seconds in 1-second chunks, then prints [message] if given.
 */

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <n> [message]", args[0]);
        process::exit(0);
    }

    let secs = args[1].parse::<u64>().unwrap_or_else(|_| {
        eprintln!("Error: <n> must be a positive integer");
        process::exit(1);
    });

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }

    if let Some(message) = args.get(2) {
        println!("{}", message);
    }
}
