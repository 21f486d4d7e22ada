//! # Attack Oracle Client
//!
//! A host-side driver for the attack oracle: it moves the TAP controller,
//! reads and writes the device registers, and enumerates every
//! (victim, aggressor) pair on the loaded board.
//!
//! ## Overview
//!
//! The crate is layered, each layer owning the one below it:
//!
//! - [`tap::Tap`]: reset, instruction shift and data shift over any
//!   [`Link`](oracle_protocol::Link).
//! - [`registers::Registers`]: one method per device register, built from
//!   the opcode table in [`oracle_protocol::Command`].
//! - [`enumerate::Enumerator`]: the victim/aggressor search, as an iterator.
//! - [`session::Session`]: identification, configuration and recovery.
//!
//! Links are provided for XVC servers ([`link::xvc::XvcLink`]) and for GPIO
//! pins through `embedded-hal` (`link::pins::PinLink`, feature `pins`).
//!
//! ## Basic Usage
//!
//! ### Connecting to a Device
//!
//! ```ignore
//! use oracle_client::{link::xvc::XvcLink, session::Session};
//!
//! let link = XvcLink::connect("127.0.0.1:2542")?;
//! let mut session = Session::open(link, Default::default())?;
//! ```
//!
//! ### Loading a Position and Enumerating
//!
//! ```ignore
//! use oracle_protocol::{Colour, Piece};
//!
//! session.set_piece("d4".parse()?, Some("K".parse()?))?;
//! session.set_side_to_move(Colour::White)?;
//! for attack in session.attacks() {
//!     let attack = attack?;
//!     println!("{} attacks {}", attack.aggressor, attack.victim);
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Error`]. Transport failures are
//! surfaced as [`Error::Link`], device faults and runaway loops abort the
//! enumeration. Nothing is retried; call [`session::Session::reset`] to
//! resynchronise with the device.
//!
//! ## Logging
//!
//! Register traffic is logged at `debug`, raw scan vectors at `trace`, and
//! identification at `info` through the `log` crate.
pub mod enumerate;
pub mod error;
pub mod link;
pub mod registers;
pub mod session;
pub mod tap;

pub use enumerate::{Attack, Enumerator};
pub use error::{Error, Result};
pub use session::{Builder, Config, Session};
