//! Status side-channel selection
//!
//! The "requires --force" line is machine-readable: a wrapper that opens
//! file descriptor 3 before running stead can tell a clean run from one
//! that stopped at a force gate without parsing the human report.

use anyhow::{Context, Result};
use declarative::{NoStatus, StatusSink, WriterStatus};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::FromRawFd;
use std::path::Path;

use crate::config::StatusChannel;

/// File descriptor probed for the status channel
const STATUS_FD: i32 = 3;

/// Build the sink for the configured channel
pub fn open(channel: &StatusChannel) -> Result<Box<dyn StatusSink>> {
    match channel {
        StatusChannel::Fd3 => Ok(match status_fd() {
            Some(file) => Box::new(WriterStatus(file)),
            None => {
                log::debug!("fd {} is not open, status lines are discarded", STATUS_FD);
                Box::new(NoStatus)
            }
        }),
        StatusChannel::Stderr => Ok(Box::new(WriterStatus(io::stderr()))),
        StatusChannel::None => Ok(Box::new(NoStatus)),
        StatusChannel::File(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open status file {}", path.display()))?;
            Ok(Box::new(WriterStatus(file)))
        }
    }
}

fn status_fd() -> Option<File> {
    // SAFETY: F_GETFD only queries the descriptor flags
    let flags = unsafe { libc::fcntl(STATUS_FD, libc::F_GETFD) };
    if flags == -1 {
        return None;
    }
    // SAFETY: the descriptor is open and was handed to us by the parent;
    // nothing else in the process owns it
    Some(unsafe { File::from_raw_fd(STATUS_FD) })
}
