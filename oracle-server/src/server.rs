use std::{
    io::{ErrorKind, Write},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use oracle_protocol::{
    Link,
    codec::vector_len,
    error::ReadError,
    xvc::{Message, XvcInfo},
};

/// Limits applied to every client connection.
#[derive(Debug, Clone)]
pub struct Config {
    /// Largest TMS (or TDI) vector accepted in one `shift:`, in bytes. Also
    /// advertised in the `getinfo:` answer, so well-behaved clients split
    /// longer scans themselves.
    pub max_vector_size: u32,
    /// A client that sends nothing for this long is disconnected, freeing
    /// the TAP for the next one.
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_vector_size: 10 * 1024 * 1024,
            read_write_timeout: Duration::from_secs(30),
        }
    }
}

/// Serves one [`Link`] to XVC clients, one connection at a time.
#[derive(Debug)]
pub struct Server<T: Link> {
    link: T,
    config: Config,
}

/// Configures a [Server] before handing it the link to serve.
///
/// # Example
///
/// ```ignore
/// use oracle_server::server::Builder;
/// use oracle_sim::SimLink;
/// use std::time::Duration;
///
/// // A 1-byte limit forces clients to send one byte of TMS/TDI per shift.
/// let mut server = Builder::new()
///     .max_vector_size(1)
///     .rw_timeout(Duration::from_secs(5))
///     .build(SimLink::new());
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Advertise and enforce a vector limit of `size` bytes.
    pub fn max_vector_size(mut self, size: u32) -> Self {
        self.config.max_vector_size = size;
        self
    }

    /// Idle time after which a client is dropped.
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Wraps `link`; nothing is bound until [`Server::listen`].
    pub fn build<T: Link>(self, link: T) -> Server<T> {
        Server::new(link, self.config)
    }
}

impl<T: Link> Server<T> {
    pub fn new(link: T, config: Config) -> Server<T> {
        Server { link, config }
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    pub fn into_inner(self) -> T {
        self.link
    }

    pub fn listen(&mut self, addr: impl ToSocketAddrs) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr)?;
        log::info!("Serving TAP over XVC on {}", listener.local_addr()?);
        self.serve(listener)
    }

    /// Accepts clients from an already bound listener until it fails.
    pub fn serve(&mut self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => {
                    if let Ok(addr) = tcp.peer_addr() {
                        log::info!("XVC client {} attached", addr);
                    }
                    if let Err(e) = self.handle_client(tcp) {
                        log::error!("XVC client dropped: {}", e);
                    }
                }
                Err(e) => log::error!("accept failed: {}", e),
            }
        }
        Ok(())
    }

    /// Serves one client until it disconnects or goes quiet.
    pub fn handle_client(&mut self, mut tcp: TcpStream) -> Result<(), ReadError> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;

        loop {
            let message = match Message::from_reader(&mut tcp, self.config.max_vector_size as usize) {
                Ok(message) => message,
                Err(ReadError::IoError(err)) => match err.kind() {
                    ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                        log::warn!(
                            "XVC client idle for {:?}, detaching",
                            self.config.read_write_timeout
                        );
                        return Ok(());
                    }
                    ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionReset => {
                        log::info!("XVC client detached");
                        return Ok(());
                    }
                    _ => return Err(err.into()),
                },
                Err(other) => return Err(other),
            };
            self.process_message(message, &mut tcp)?;
        }
    }

    /// Runs one shift on the link. Any failure, or a TDO vector of the wrong
    /// length, is answered with zeros so the client stays in step.
    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> Box<[u8]> {
        let len = vector_len(num_bits);
        match self.link.shift(num_bits, tms, tdi) {
            Ok(tdo) if tdo.len() == len => tdo,
            Ok(tdo) => {
                log::error!("shift: link returned {} TDO bytes, expected {}", tdo.len(), len);
                vec![0; len].into_boxed_slice()
            }
            Err(e) => {
                log::error!("shift: link failed: {}", e);
                vec![0; len].into_boxed_slice()
            }
        }
    }

    /// Answers one message.
    fn process_message(&mut self, message: Message, tcp: &mut impl Write) -> Result<(), ReadError> {
        match message {
            Message::GetInfo => {
                log::debug!("getinfo: advertising {} byte vectors", self.config.max_vector_size);
                XvcInfo::new(self.config.max_vector_size).write_to(tcp)?;
            }
            Message::SetTck { period_ns } => {
                // The reply has no error encoding; keep the request on failure.
                let applied = self.link.set_tck(period_ns).unwrap_or_else(|e| {
                    log::error!("settck: link refused {} ns: {}", period_ns, e);
                    period_ns
                });
                log::debug!("settck: requested {} ns, applied {} ns", period_ns, applied);
                tcp.write_all(&applied.to_le_bytes())?;
            }
            Message::Shift { num_bits, tms, tdi } => {
                log::debug!("shift: {} clocks", num_bits);
                log::trace!("tms={:02x?} tdi={:02x?}", &tms[..], &tdi[..]);
                let tdo = self.shift(num_bits, &tms, &tdi);
                log::trace!("tdo={:02x?}", &tdo[..]);
                tcp.write_all(&tdo)?;
            }
        }
        Ok(())
    }
}
