//! Xilinx Virtual Cable 1.0 messages, used to carry scans to a remote TAP.
use std::io::{self, BufRead, BufReader, Read, Write};

use crate::{codec::vector_len, error::ReadError};

const INFO_PREFIX: &str = "xvcServer_v";
const VERSION: &str = "1.0";
const DELIMITER: u8 = b':';
const MAX_COMMAND_LEN: usize = 8;

/// A request sent from the client to the server. Every request is answered
/// before the next one is sent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    /// Query protocol version and maximum vector size.
    GetInfo,
    /// Request a TCK period; the server answers with the period it applied.
    SetTck { period_ns: u32 },
    /// Clock `num_bits` TMS/TDI pairs and return the sampled TDO vector.
    Shift {
        num_bits: u32,
        tms: Box<[u8]>,
        tdi: Box<[u8]>,
    },
}

impl Message {
    const GET_INFO: &[u8] = b"getinfo";
    const SET_TCK: &[u8] = b"settck";
    const SHIFT: &[u8] = b"shift";

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Message::GetInfo => {
                writer.write_all(Self::GET_INFO)?;
                writer.write_all(&[DELIMITER])
            }
            Message::SetTck { period_ns } => {
                writer.write_all(Self::SET_TCK)?;
                writer.write_all(&[DELIMITER])?;
                writer.write_all(&period_ns.to_le_bytes())
            }
            Message::Shift { num_bits, tms, tdi } => {
                writer.write_all(Self::SHIFT)?;
                writer.write_all(&[DELIMITER])?;
                writer.write_all(&num_bits.to_le_bytes())?;
                writer.write_all(tms)?;
                writer.write_all(tdi)
            }
        }
    }

    /// Reads one message, refusing shift vectors longer than `max_vector_len` bytes.
    pub fn from_reader(reader: &mut impl Read, max_vector_len: usize) -> Result<Message, ReadError> {
        let mut name = Vec::with_capacity(MAX_COMMAND_LEN);
        loop {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            if byte[0] == DELIMITER {
                break;
            }
            name.push(byte[0]);
            if name.len() > MAX_COMMAND_LEN {
                return Err(ReadError::InvalidCommand(
                    String::from_utf8_lossy(&name).to_string(),
                ));
            }
        }

        match name.as_slice() {
            Self::GET_INFO => Ok(Message::GetInfo),
            Self::SET_TCK => Ok(Message::SetTck {
                period_ns: read_u32(reader)?,
            }),
            Self::SHIFT => {
                let num_bits = read_u32(reader)?;
                let num_bytes = vector_len(num_bits);
                if num_bytes > max_vector_len {
                    return Err(ReadError::TooManyBytes {
                        max: max_vector_len,
                        got: num_bytes,
                    });
                }
                let mut tms = vec![0u8; num_bytes].into_boxed_slice();
                reader.read_exact(&mut tms)?;
                let mut tdi = vec![0u8; num_bytes].into_boxed_slice();
                reader.read_exact(&mut tdi)?;
                Ok(Message::Shift { num_bits, tms, tdi })
            }
            _ => Err(ReadError::InvalidCommand(
                String::from_utf8_lossy(&name).to_string(),
            )),
        }
    }
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// The server's answer to [`Message::GetInfo`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XvcInfo {
    max_vector_len: u32,
}

impl XvcInfo {
    pub fn new(max_vector_len: u32) -> XvcInfo {
        XvcInfo { max_vector_len }
    }

    /// Largest TMS (or TDI) vector, in bytes, the server accepts in one shift.
    pub fn max_vector_len(&self) -> u32 {
        self.max_vector_len
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "{INFO_PREFIX}{VERSION}:{}", self.max_vector_len)
    }

    pub fn from_reader(reader: &mut impl Read) -> Result<XvcInfo, ReadError> {
        // Byte-wise so nothing past the newline is consumed from the stream.
        let mut buf_reader = BufReader::with_capacity(1, reader);
        let mut line = Vec::with_capacity(32);
        buf_reader.read_until(b'\n', &mut line)?;
        let line = str::from_utf8(line.trim_ascii_end())?;

        let rest = line.strip_prefix(INFO_PREFIX).ok_or_else(|| {
            ReadError::InvalidFormat("Invalid prefix in info message".to_string())
        })?;
        let (version, max_vector_len) = rest.split_once(':').ok_or_else(|| {
            ReadError::InvalidFormat("Missing ':' separator in info message".to_string())
        })?;
        if version != VERSION {
            return Err(ReadError::UnsupportedVersion(version.to_string()));
        }
        Ok(XvcInfo::new(max_vector_len.parse()?))
    }
}

impl Default for XvcInfo {
    fn default() -> XvcInfo {
        XvcInfo::new(10 * 1024 * 1024)
    }
}
