use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;

use crate::error::BuiltinError;
use crate::pipeline::Pipeline;

/// What the read loop should do after built-in dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a built-in; run the pipeline.
    External,
    /// Handled here; read the next line.
    Handled,
    /// `exit` was requested.
    Exit,
}

/// Checks if the pipeline's first command is a built-in and, if so, runs it.
/// Supported built-ins are "exit" and "cd". Only the first argument of the
/// first stage is inspected; later stages and redirections are ignored.
pub fn handle_builtin(pipeline: &Pipeline) -> Dispatch {
    let first = match pipeline.stages.first() {
        Some(stage) => stage,
        None => return Dispatch::External,
    };
    match first.program() {
        Some("exit") => {
            println!("Good bye!! ");
            Dispatch::Exit
        }
        Some("cd") => {
            let target = first.arguments().get(1).map(String::as_str);
            if let Err(e) = run_cd(target, env::var_os("HOME"), &mut io::stdout()) {
                eprintln!("{}", e);
            }
            Dispatch::Handled
        }
        _ => Dispatch::External,
    }
}

/// `cd` with its progress lines: the directory is announced before the
/// change is attempted, the new working directory only after it succeeds.
fn run_cd<W: Write>(target: Option<&str>, home: Option<OsString>, out: &mut W) -> Result<PathBuf, BuiltinError> {
    let dir = cd_target(target, home)?;
    let _ = writeln!(out, "Changing to directory '{}'", dir.display());
    let cwd = enter(dir)?;
    let _ = writeln!(out, "You are now in {}", cwd.display());
    Ok(cwd)
}

/// Changes the working directory to `target`, or to `home` when no target is
/// given. Returns the new working directory.
pub fn change_directory(target: Option<&str>, home: Option<OsString>) -> Result<PathBuf, BuiltinError> {
    enter(cd_target(target, home)?)
}

fn cd_target(target: Option<&str>, home: Option<OsString>) -> Result<PathBuf, BuiltinError> {
    match target {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => home.map(PathBuf::from).ok_or(BuiltinError::HomeUnset),
    }
}

fn enter(dir: PathBuf) -> Result<PathBuf, BuiltinError> {
    debug!("changing directory to {}", dir.display());
    env::set_current_dir(&dir).map_err(|source| BuiltinError::ChangeDir {
        dir: dir.display().to_string(),
        source,
    })?;
    Ok(env::current_dir().unwrap_or(dir))
}
