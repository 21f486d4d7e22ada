//! # Attack Oracle Protocol
//!
//! Types and encodings shared by everything that talks to the attack oracle,
//! a chess board accelerator that reports attacked squares ("victims") and the
//! pieces attacking them ("aggressors") through a JTAG test access port.
//!
//! ## Overview
//!
//! - [`protocol`]: the instruction table ([`Command`]), mask and state modes,
//!   squares, pieces and status decoding.
//! - [`codec`]: the fixed TMS walks of the TAP controller and [`codec::Scan`],
//!   which packs one complete instruction or data shift into TMS/TDI vectors.
//! - [`link`]: the [`Link`] trait every transport and device model implements.
//! - [`xvc`]: the Xilinx Virtual Cable 1.0 messages used to reach a TAP over
//!   the network.
//!
//! ## Encoding a Scan
//!
//! ```
//! use oracle_protocol::{Command, codec::Scan};
//!
//! let scan = Scan::instruction(Command::Identification.opcode());
//! // five preamble clocks, eight opcode bits, two postamble clocks
//! assert_eq!(scan.num_bits(), 15);
//! ```
//!
//! ## Decoding a Status
//!
//! ```
//! use oracle_protocol::{Square, Status};
//!
//! assert_eq!(Status::decode(0x40), Status::Exhausted);
//! assert_eq!(Status::decode(27), Status::Found(Square::new(27).unwrap()));
//! ```
//!
//! ## Bit Order
//!
//! All registers are shifted least significant bit first, and packed vectors
//! keep bit `n` in byte `n / 8` at position `n % 8`.

pub mod codec;
pub mod error;
pub mod link;
pub mod protocol;
pub mod xvc;

pub use link::Link;
pub use protocol::*;
