//! A line-oriented command interpreter: each input line becomes a pipeline
//! of external programs with optional redirection and background execution.

pub mod builtins;
pub mod error;
pub mod exec;
pub mod expand;
pub mod parser;
pub mod pipeline;
pub mod shell;
pub mod signals;
pub mod utils;
