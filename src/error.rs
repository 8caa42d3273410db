use std::ffi::NulError;
use std::io;

use thiserror::Error;

/// Errors raised while launching a pipeline.
///
/// Everything here is reported by the read loop; only [`ExecError::Fork`]
/// terminates the interpreter.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("open input file failed: {path}: {source}")]
    InputOpen { path: String, source: nix::Error },
    #[error("pipe failed: {0}")]
    Pipe(nix::Error),
    #[error("dup failed: {0}")]
    Dup(nix::Error),
    #[error("fork failed: {0}")]
    Fork(nix::Error),
    #[error("waitpid failed: {0}")]
    Wait(nix::Error),
    #[error("argument contains a NUL byte: {0}")]
    NulByte(#[from] NulError),
    #[error("empty command in pipeline stage {0}")]
    EmptyStage(usize),
}

impl ExecError {
    /// Process-creation failure has no narrower scope to contain it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::Fork(_))
    }
}

/// Errors reported by built-in commands. None of them stop the interpreter.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: HOME environment variable not set")]
    HomeUnset,
    #[error("cd: {dir}: {source}")]
    ChangeDir { dir: String, source: io::Error },
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unable to register signal handler: {0}")]
    Register(io::Error),
    #[error("unable to ignore SIGINT: {0}")]
    Disposition(nix::Error),
    #[error("unable to spawn reaper thread: {0}")]
    Spawn(io::Error),
    #[error("reaper already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("error reading input: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
