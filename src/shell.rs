use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::builtins::{handle_builtin, Dispatch};
use crate::error::{ExecError, ShellError};
use crate::exec::{execute_pipeline, Execution};
use crate::parser::parse_command_line;
use crate::pipeline::Pipeline;
use crate::utils;

/// Global prompt string.
pub static PROMPT: &str = "myshell> ";

/// Result of evaluating one command line.
#[derive(Debug)]
pub enum Evaluation {
    /// Nothing was launched: empty line or a built-in.
    Idle,
    /// The pipeline was launched (and waited for, unless in background).
    Ran(Execution),
    /// `exit` was requested.
    Exit,
}

/// Prints the command table, dispatches built-ins and otherwise executes the
/// pipeline. The pipeline is released before this returns on every path.
pub fn evaluate(pipeline: Pipeline) -> Result<Evaluation, ExecError> {
    print!("{}", pipeline);
    if pipeline.is_empty() {
        return Ok(Evaluation::Idle);
    }
    match handle_builtin(&pipeline) {
        Dispatch::Exit => Ok(Evaluation::Exit),
        Dispatch::Handled => Ok(Evaluation::Idle),
        Dispatch::External => execute_pipeline(pipeline).map(Evaluation::Ran),
    }
}

/// Runs the main shell loop: prints the prompt (if enabled), reads input,
/// parses it, and evaluates commands. Returns when input ends or `exit` is
/// entered.
///
/// - `emit_prompt`: if true, prints the command prompt.
/// - `verbose`: if true, echoes each received line.
pub fn run_shell(emit_prompt: bool, verbose: bool) -> Result<(), ShellError> {
    let mut editor = DefaultEditor::new()?;
    let prompt = if emit_prompt { PROMPT } else { "" };

    loop {
        let cmdline = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(e.into()),
        };
        if cmdline.trim().is_empty() {
            continue;
        }
        if verbose {
            println!("Received command: {}", cmdline.trim());
        }
        let _ = editor.add_history_entry(cmdline.as_str());

        let pipeline = parse_command_line(&cmdline);
        match evaluate(pipeline) {
            Ok(Evaluation::Exit) => return Ok(()),
            Ok(Evaluation::Ran(execution)) => {
                debug!("pids {:?} finished with {:?}", execution.pids, execution.status);
            }
            Ok(Evaluation::Idle) => {}
            Err(e) if e.is_fatal() => utils::fatal(&e.to_string()),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}
