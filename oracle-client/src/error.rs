use std::{fmt::Display, io};

use oracle_protocol::{
    Command,
    error::{DecodeError, ReadError},
};
use thiserror::Error;

/// Which enumeration loop ran past its bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Loop {
    Victims,
    Aggressors,
}

impl Display for Loop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loop::Victims => write!(f, "victims"),
            Loop::Aggressors => write!(f, "aggressors"),
        }
    }
}

/// Everything that can go wrong between the caller and the device.
///
/// None of these are retried. After a `DeviceFault` or `Overrun` the device
/// state is unknown; re-open the session (TAP reset plus identification)
/// before issuing further commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("link failure: {0}")]
    Link(#[from] io::Error),
    #[error("XVC handshake failed: {0}")]
    Xvc(#[from] ReadError),
    #[error("identification mismatch: expected {expected:#010x}, got {got:#010x}")]
    IdMismatch { expected: u32, got: u32 },
    #[error("device reported a fault (status {status:#04x})")]
    DeviceFault { status: u8 },
    #[error("found more than {limit} {which} without an exhausted status")]
    Overrun { which: Loop, limit: u32 },
    #[error("{0} cannot be written")]
    NotWritable(Command),
    #[error("{0} cannot be read")]
    NotReadable(Command),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
