use std::process;

pub fn print_usage() {
    println!("Usage: pipesh [-hvp]");
    println!("   -h   Print this help message");
    println!("   -v   Enable verbose mode (debug logging, echo commands)");
    println!("   -p   Do not print a command prompt");
    process::exit(1);
}

/// Reports an unrecoverable error and terminates the interpreter.
pub fn fatal(msg: &str) -> ! {
    eprintln!("Error: {}", msg);
    process::exit(1);
}
