//! # Attack Oracle XVC Server
//!
//! Serves any [`Link`](oracle_protocol::Link) to Xilinx Virtual Cable 1.0
//! clients. Pointing the server at the device model from `oracle-sim` gives
//! a network-reachable attack oracle for tools that only speak XVC; pointing
//! it at a pin link forwards to real hardware.
//!
//! ## Usage
//!
//! ```ignore
//! use oracle_server::server::{Config, Server};
//! use oracle_sim::SimLink;
//!
//! let mut server = Server::new(SimLink::new(), Config::default());
//! server.listen("127.0.0.1:2542")?;
//! ```
//!
//! ## Error Handling
//!
//! XVC 1.0 has no way to report a failed shift. When the link fails, the
//! error is logged and the client receives an all-zero TDO vector of the
//! expected length, so the stream stays in sync.
//!
//! ## Thread Model
//!
//! Clients are served one at a time on the calling thread. A TAP is a single
//! shared state machine, so interleaving two clients would corrupt both.
pub mod server;
