use std::{
    io::{self, Read},
    net::{TcpStream, ToSocketAddrs},
};

use oracle_protocol::{
    Link,
    codec::vector_len,
    error::ReadError,
    xvc::{Message, XvcInfo},
};

use crate::error::{Error, Result};

/// A TAP reached through an XVC server.
///
/// The connection is opened with a `getinfo:` handshake. Shifts longer than
/// the server's vector limit are split at byte boundaries, which keeps TMS
/// and TDI aligned across the pieces.
pub struct XvcLink {
    tcp: TcpStream,
    max_vector_len: usize,
}

impl XvcLink {
    /// Connects and queries the server's capabilities. A server that speaks
    /// another protocol version, or accepts no vector at all, is rejected with
    /// [`Error::Xvc`].
    pub fn connect(addr: impl ToSocketAddrs) -> Result<XvcLink> {
        let tcp = TcpStream::connect(addr)?;
        tcp.set_nodelay(true)?;
        let mut link = XvcLink {
            tcp,
            max_vector_len: 0,
        };
        let info = link.get_info()?;
        if info.max_vector_len() == 0 {
            return Err(Error::Xvc(ReadError::InvalidFormat(
                "server accepts zero-length vectors only".to_string(),
            )));
        }
        link.max_vector_len = info.max_vector_len() as usize;
        log::info!(
            "connected to XVC server, max vector length {} bytes",
            link.max_vector_len
        );
        Ok(link)
    }

    /// Query server capabilities.
    pub fn get_info(&mut self) -> std::result::Result<XvcInfo, ReadError> {
        Message::GetInfo.write_to(&mut self.tcp)?;
        XvcInfo::from_reader(&mut self.tcp)
    }

    pub fn max_vector_len(&self) -> usize {
        self.max_vector_len
    }

    fn shift_chunk(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Vec<u8>> {
        Message::Shift {
            num_bits,
            tms: tms.into(),
            tdi: tdi.into(),
        }
        .write_to(&mut self.tcp)?;
        let mut buf = vec![0; vector_len(num_bits)];
        self.tcp.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Link for XvcLink {
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool> {
        let tdo = self.shift_chunk(1, &[u8::from(tms)], &[u8::from(tdi)])?;
        Ok(tdo[0] & 1 == 1)
    }

    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        let total = vector_len(num_bits);
        if tms.len() < total || tdi.len() < total {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bits need {} vector bytes", num_bits, total),
            ));
        }
        let chunk_bits = self.max_vector_len.saturating_mul(8).min(u32::MAX as usize) as u32;
        let mut tdo = Vec::with_capacity(total);
        let mut done = 0u32;
        while done < num_bits {
            let bits = (num_bits - done).min(chunk_bits);
            let start = (done / 8) as usize;
            let end = start + vector_len(bits);
            tdo.extend(self.shift_chunk(bits, &tms[start..end], &tdi[start..end])?);
            done += bits;
        }
        Ok(tdo.into_boxed_slice())
    }

    /// Set the JTAG Test Clock (TCK) period.
    // The server may answer with a different period if it cannot match the request.
    fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        Message::SetTck { period_ns }.write_to(&mut self.tcp)?;
        let mut buf = [0u8; 4];
        self.tcp.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}
