//! Transports implementing [`Link`](oracle_protocol::Link).
//!
//! - [`xvc::XvcLink`]: a TAP behind an XVC 1.0 server.
//! - [`pins::PinLink`]: four GPIO lines bit-banged through `embedded-hal`
//!   (feature `pins`).
//!
//! The in-process device model lives in the `oracle-sim` crate.
#[cfg(feature = "pins")]
pub mod pins;
pub mod xvc;
