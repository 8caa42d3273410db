//! The reaper: collects terminated children in the background and records
//! each wake-up in an append-only log file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use once_cell::sync::OnceCell;
use signal_hook::{consts::signal::SIGCHLD, iterator::Signals};

use crate::error::SignalError;

/// Default reaper log, relative to the working directory at event time.
pub const DEFAULT_LOG_FILE: &str = "log.txt";

/// Line appended to the log on every reaper wake-up.
pub const CHILD_EXIT_MESSAGE: &str = "A child process has terminated.\n";

static REAPER_LOG: OnceCell<PathBuf> = OnceCell::new();

/// Installs the shell's signal dispositions:
/// - SIGINT: ignored, so a foreground wait cannot be interrupted.
/// - SIGCHLD: handled on a dedicated thread that logs the event and reaps
///   every terminated child.
///
/// May only succeed once per process. If installation fails, no log path is
/// recorded and the call may be retried.
pub fn install_signal_handlers(log_path: PathBuf) -> Result<(), SignalError> {
    install_once(&REAPER_LOG, log_path, start_reaper)
}

/// Records `log_path` in `cell` only once `start` has succeeded.
fn install_once<F>(cell: &OnceCell<PathBuf>, log_path: PathBuf, start: F) -> Result<(), SignalError>
where
    F: FnOnce(&Path) -> Result<(), SignalError>,
{
    let mut started = false;
    cell.get_or_try_init(|| {
        start(&log_path)?;
        started = true;
        Ok::<_, SignalError>(log_path)
    })?;
    if started {
        Ok(())
    } else {
        Err(SignalError::AlreadyInstalled)
    }
}

fn start_reaper(log_path: &Path) -> Result<(), SignalError> {
    // SAFETY: SigIgn installs no handler code.
    unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }.map_err(SignalError::Disposition)?;

    let mut signals = Signals::new([SIGCHLD]).map_err(SignalError::Register)?;
    debug!("starting reaper, logging to {}", log_path.display());
    let log_path = log_path.to_path_buf();
    thread::Builder::new()
        .name("reaper".into())
        .spawn(move || {
            for _ in signals.forever() {
                on_child_exit(&log_path);
            }
        })
        .map_err(SignalError::Spawn)?;
    Ok(())
}

/// The log path the reaper was installed with, if any.
pub fn reaper_log_path() -> Option<&'static Path> {
    REAPER_LOG.get().map(PathBuf::as_path)
}

/// Handles one SIGCHLD delivery. Returns the number of children reaped.
pub fn on_child_exit(log_path: &Path) -> usize {
    if let Err(e) = record_child_exit(log_path) {
        warn!("unable to write {}: {}", log_path.display(), e);
    }
    reap_terminated()
}

/// Appends [`CHILD_EXIT_MESSAGE`] to `log_path`, closing it right after.
pub fn record_child_exit(log_path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    file.write_all(CHILD_EXIT_MESSAGE.as_bytes())
}

/// Reaps every child that has already terminated, without blocking.
///
/// Signals coalesce, so one wake-up may stand for several exits. A child
/// collected here is one the foreground wait will see as `ECHILD`.
pub fn reap_terminated() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                debug!("reaped {:?}", status);
                reaped += 1;
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                warn!("waitpid failed: {}", e);
                break;
            }
        }
    }
    reaped
}
