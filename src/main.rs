use std::env;
use std::path::PathBuf;

use env_logger::Env;
use pipesh::{shell, signals, utils};

fn main() {
    // Parse command-line arguments.
    let args: Vec<String> = env::args().collect();
    let mut emit_prompt = true;
    let mut verbose = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" => utils::print_usage(),
            "-v" => verbose = true,
            "-p" => emit_prompt = false,
            _ => {}
        }
    }

    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    // Install signal handlers.
    if let Err(e) = signals::install_signal_handlers(PathBuf::from(signals::DEFAULT_LOG_FILE)) {
        utils::fatal(&e.to_string());
    }

    // Run the main shell loop with the options.
    if let Err(e) = shell::run_shell(emit_prompt, verbose) {
        utils::fatal(&e.to_string());
    }
}
