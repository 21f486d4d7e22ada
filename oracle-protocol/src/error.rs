use std::{io, num::ParseIntError, str::Utf8Error};

use thiserror::Error;

/// Errors raised when a raw register value does not map onto a protocol type.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DecodeError {
    #[error("square index {0} is outside the board")]
    InvalidSquare(u8),
    #[error("invalid square name '{0}'")]
    InvalidSquareName(String),
    #[error("invalid mask mode {0:#04b}")]
    InvalidMaskMode(u8),
    #[error("invalid state mode {0:#05b}")]
    InvalidStateMode(u8),
    #[error("invalid piece code {0:#x}")]
    InvalidPieceCode(u8),
    #[error("invalid piece name '{0}'")]
    InvalidPieceName(String),
    #[error("invalid colour '{0}'")]
    InvalidColour(String),
    #[error("data register width {0} is outside 1..=32")]
    InvalidWidth(u8),
}

/// Errors that may occur when reading an XVC message from a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error("Received invalid command {0}")]
    InvalidCommand(String),
    #[error("Unsupported version {0}")]
    UnsupportedVersion(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("Message too large! Maximum is {max}, but got {got}")]
    TooManyBytes { max: usize, got: usize },
}

impl From<Utf8Error> for ReadError {
    fn from(value: Utf8Error) -> Self {
        ReadError::InvalidFormat(format!("Invalid UTF8: {}", value))
    }
}

impl From<ParseIntError> for ReadError {
    fn from(value: ParseIntError) -> Self {
        ReadError::InvalidFormat(format!("Invalid integer: {}", value))
    }
}
