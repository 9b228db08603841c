//! Unified error type for the blink1-control crate.
//!
//! [`Blink1Error`] wraps the device-layer error (`DeviceError`) and
//! domain-specific error kinds (`SequenceTooLong`, `Color`, `Config`).
//! `From` impls allow `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::handle::DeviceError;

/// Unified error type for blink1-control operations.
#[derive(Debug)]
pub enum Blink1Error {
    /// Device communication error (enumerate, open, command failure).
    Device(DeviceError),
    /// A play-sequence request exceeds the detected pattern-memory capacity.
    /// Raised before any device write.
    SequenceTooLong {
        len: usize,
        start: u8,
        capacity: usize,
    },
    /// Color parsing error.
    Color(String),
    /// Configuration error (missing config directory, invalid defaults).
    Config(String),
    /// Standard I/O error (config file read/write).
    Io(std::io::Error),
}

impl fmt::Display for Blink1Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blink1Error::Device(e) => write!(f, "{e}"),
            Blink1Error::SequenceTooLong {
                len,
                start,
                capacity,
            } => {
                write!(
                    f,
                    "Sequence too long: {len} entries at position {start} \
                     exceed pattern memory capacity of {capacity}"
                )
            }
            Blink1Error::Color(e) => write!(f, "Color error: {e}"),
            Blink1Error::Config(e) => write!(f, "Config error: {e}"),
            Blink1Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Blink1Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Blink1Error::Device(e) => Some(e),
            Blink1Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for Blink1Error {
    fn from(e: DeviceError) -> Self {
        Blink1Error::Device(e)
    }
}

impl From<std::io::Error> for Blink1Error {
    fn from(e: std::io::Error) -> Self {
        Blink1Error::Io(e)
    }
}

/// Crate-level Result alias using [`Blink1Error`].
pub type Result<T> = std::result::Result<T, Blink1Error>;
