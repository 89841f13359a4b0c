//! Error types for the serial monitor
//!
//! Every variant is terminal for a run: the binary reports it as
//! `Error: <message>` and exits with status 1. Messages leave the
//! underlying cause to the error's `source()`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The device does not exist, is busy, or permissions were denied
    #[error("could not open {path}")]
    DeviceOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// Querying the number of buffered input bytes failed
    #[error("could not query {path} for pending input")]
    Poll {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("read from {path} failed")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Writing decoded text to the console or capture log failed
    #[error("could not write monitor output")]
    Output(#[from] io::Error),

    #[error("could not write capture log {}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown device profile '{0}' (see `serial-monitor devices`)")]
    UnknownDevice(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
