//! Pipeline execution: one process per stage, connected left to right.
//!
//! Every descriptor created here is close-on-exec. A child only keeps what it
//! explicitly `dup2`s onto 0, 1 and 2, so sibling stages never hold stray pipe
//! ends and nothing leaks across pipelines.

use std::ffi::{CStr, CString};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::ExecError;
use crate::pipeline::Pipeline;

/// Mode bits for files created by redirection, before umask.
const CREATE_MODE: libc::mode_t = 0o666;

/// What happened when a pipeline was launched.
#[derive(Debug)]
pub struct Execution {
    /// One pid per stage, in stage order.
    pub pids: Vec<Pid>,
    /// Status of the last process for a foreground pipeline. `None` for
    /// background pipelines, or when the reaper collected it first.
    pub status: Option<WaitStatus>,
}

/// Where a stage's standard output goes.
enum Output {
    /// A pipe write end or a duplicate of our own stdout.
    Fd(OwnedFd),
    /// A file opened inside the child.
    File(CString),
}

/// A stage's argument vector and the null-terminated pointer array
/// `execvp(3)` takes, both built before any fork.
struct ExecArgs {
    argv: Vec<CString>,
    pointers: Vec<*const libc::c_char>,
}

impl ExecArgs {
    fn new(argv: Vec<CString>) -> Self {
        let mut pointers: Vec<*const libc::c_char> = argv.iter().map(|argument| argument.as_ptr()).collect();
        pointers.push(std::ptr::null());
        ExecArgs { argv, pointers }
    }

    fn program(&self) -> &CStr {
        &self.argv[0]
    }
}

/// Redirection paths and flags, converted before any fork.
struct ChildRedirects {
    error_file: Option<CString>,
    append: bool,
    combine_error_with_output: bool,
}

impl ChildRedirects {
    fn write_flags(&self) -> OFlag {
        let base = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_CLOEXEC;
        if self.append {
            base | OFlag::O_APPEND
        } else {
            base | OFlag::O_TRUNC
        }
    }
}

/// Executes a built pipeline and releases it.
///
/// Returns after the last process exits for a foreground pipeline, or right
/// after the last launch for a background one. An empty pipeline is a no-op.
pub fn execute_pipeline(pipeline: Pipeline) -> Result<Execution, ExecError> {
    if pipeline.is_empty() {
        return Ok(Execution {
            pids: Vec::new(),
            status: None,
        });
    }

    let argvs = prepare_arguments(&pipeline)?;
    let output_file = pipeline.output_file.as_deref().map(CString::new).transpose()?;
    let redirects = ChildRedirects {
        error_file: pipeline.error_file.as_deref().map(CString::new).transpose()?,
        append: pipeline.append,
        combine_error_with_output: pipeline.combine_error_with_output,
    };

    let mut input = open_input(pipeline.input_file.as_deref())?;
    let mut pids = Vec::with_capacity(argvs.len());

    for (index, args) in argvs.iter().enumerate() {
        let is_last = index + 1 == argvs.len();

        let (output, next_input) = if is_last {
            let output = match &output_file {
                Some(path) => Output::File(path.clone()),
                None => Output::Fd(dup_cloexec(libc::STDOUT_FILENO)?),
            };
            (output, None)
        } else {
            let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;
            // SAFETY: pipe2 just returned these descriptors and nothing else owns them.
            let (read, write) = unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) };
            (Output::Fd(write), Some(read))
        };

        // SAFETY: the child neither allocates nor takes locks; it only makes
        // raw system calls on the argument and path buffers built above.
        match unsafe { unistd::fork() }.map_err(ExecError::Fork)? {
            ForkResult::Child => exec_child(input.as_raw_fd(), &output, args, &redirects, is_last),
            ForkResult::Parent { child } => {
                debug!("launched stage {} ({:?}) as pid {}", index, args.program(), child);
                pids.push(child);
            }
        }

        // The child holds its own copies now.
        drop(output);
        match next_input {
            Some(read) => input = read,
            None => break,
        }
    }
    drop(input);

    let status = match pids.last() {
        Some(&last) if !pipeline.background => wait_for(last)?,
        Some(&last) => {
            debug!("pid {} left running in the background", last);
            None
        }
        None => None,
    };

    Ok(Execution { pids, status })
}

/// Waits for `pid` to terminate.
///
/// The reaper may collect the child before we do; `ECHILD` is treated as
/// completion and yields `None`.
pub fn wait_for(pid: Pid) -> Result<Option<WaitStatus>, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => return Ok(Some(status)),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                debug!("pid {} already reaped", pid);
                return Ok(None);
            }
            Err(e) => return Err(ExecError::Wait(e)),
        }
    }
}

fn prepare_arguments(pipeline: &Pipeline) -> Result<Vec<ExecArgs>, ExecError> {
    pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            if stage.is_empty() {
                return Err(ExecError::EmptyStage(index));
            }
            stage
                .arguments()
                .iter()
                .map(|argument| CString::new(argument.as_str()).map_err(ExecError::from))
                .collect::<Result<Vec<_>, _>>()
                .map(ExecArgs::new)
        })
        .collect()
}

/// The first stage reads from `input_file` when given, else from a duplicate
/// of our own stdin.
fn open_input(input_file: Option<&str>) -> Result<OwnedFd, ExecError> {
    match input_file {
        Some(path) => {
            let fd = fcntl::open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty()).map_err(|source| {
                ExecError::InputOpen {
                    path: path.to_string(),
                    source,
                }
            })?;
            // SAFETY: open just returned this descriptor.
            Ok(unsafe { OwnedFd::from_raw_fd(fd) })
        }
        None => dup_cloexec(libc::STDIN_FILENO),
    }
}

fn dup_cloexec(fd: RawFd) -> Result<OwnedFd, ExecError> {
    let new_fd = fcntl::fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(0)).map_err(ExecError::Dup)?;
    // SAFETY: fcntl just returned this descriptor.
    Ok(unsafe { OwnedFd::from_raw_fd(new_fd) })
}

/// Child side of a fork: rebinds stdio and replaces the process image.
/// Never returns.
fn exec_child(input: RawFd, output: &Output, args: &ExecArgs, redirects: &ChildRedirects, is_last: bool) -> ! {
    rebind(input, libc::STDIN_FILENO, "dup2 stdin");

    let output_fd = match output {
        Output::Fd(fd) => fd.as_raw_fd(),
        Output::File(path) => open_for_write(path, redirects.write_flags(), "open output file failed"),
    };
    rebind(output_fd, libc::STDOUT_FILENO, "dup2 stdout");

    if let Some(path) = &redirects.error_file {
        let error_fd = open_for_write(path, redirects.write_flags(), "open error file failed");
        rebind(error_fd, libc::STDERR_FILENO, "dup2 stderr");
    } else if redirects.combine_error_with_output && is_last {
        if let Err(e) = unistd::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) {
            child_fail(&[b"dup2 stderr"], e);
        }
    }

    let program = args.program();
    // SAFETY: `pointers` is null-terminated and points into `argv`, which
    // outlives the call.
    unsafe { libc::execvp(program.as_ptr(), args.pointers.as_ptr()) };
    child_fail(&[b"pipesh: ", program.to_bytes()], Errno::last())
}

fn open_for_write(path: &CStr, flags: OFlag, context: &str) -> RawFd {
    match fcntl::open(path, flags, Mode::from_bits_truncate(CREATE_MODE)) {
        Ok(fd) => fd,
        Err(e) => child_fail(&[context.as_bytes(), b": ", path.to_bytes()], e),
    }
}

/// `dup2(from, to)` then close `from`.
///
/// When `from` already occupies `to` (the interpreter started with that
/// stream closed), only its close-on-exec flag is cleared.
fn rebind(from: RawFd, to: RawFd, context: &str) {
    if from == to {
        if let Err(e) = fcntl::fcntl(to, FcntlArg::F_SETFD(FdFlag::empty())) {
            child_fail(&[context.as_bytes()], e);
        }
        return;
    }
    if let Err(e) = unistd::dup2(from, to) {
        child_fail(&[context.as_bytes()], e);
    }
    let _ = unistd::close(from);
}

/// Reports a failure from a forked child and exits it with status 1.
///
/// Only raw `write(2)` is used: the parent may have other threads, so the
/// child must not allocate or take locks.
fn child_fail(context: &[&[u8]], error: Errno) -> ! {
    for part in context {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }
    let _ = unistd::write(libc::STDERR_FILENO, b": ");
    let _ = unistd::write(libc::STDERR_FILENO, error.desc().as_bytes());
    let _ = unistd::write(libc::STDERR_FILENO, b"\n");
    // SAFETY: _exit skips atexit handlers and stdio flushing, which must not
    // run in a forked child.
    unsafe { libc::_exit(1) }
}
