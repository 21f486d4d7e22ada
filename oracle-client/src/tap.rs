//! The TAP primitives: reset, instruction shift, data shift.
use oracle_protocol::{Link, codec::Scan};

use crate::error::Result;

/// Drives a [`Link`] through complete TAP operations.
///
/// Every operation starts and ends in Run-Test/Idle, so operations compose
/// without tracking the controller position. Each one is issued as a single
/// [`Link::shift`] so batching transports send it in one round trip.
pub struct Tap<L> {
    link: L,
}

impl<L: Link> Tap<L> {
    pub fn new(link: L) -> Tap<L> {
        Tap { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Five TMS-high clocks to Test-Logic-Reset, then one low into Run-Test/Idle.
    /// Safe to issue from any controller state, including mid-scan.
    pub fn reset_to_idle(&mut self) -> Result<()> {
        log::debug!("TAP reset");
        self.run(&Scan::reset())?;
        Ok(())
    }

    /// Loads `opcode` into the instruction register and returns the bits
    /// captured out of it.
    pub fn shift_instruction(&mut self, opcode: u8) -> Result<u8> {
        let captured = self.run(&Scan::instruction(opcode))?;
        Ok(captured as u8)
    }

    /// Shifts the low `width` bits of `value` through the selected data
    /// register and returns its previous contents.
    pub fn shift_data(&mut self, value: u32, width: u8) -> Result<u32> {
        let scan = Scan::data(value, width)?;
        self.run(&scan)
    }

    fn run(&mut self, scan: &Scan) -> Result<u32> {
        log::trace!(
            "scan: num_bits={}, tms={:02x?}, tdi={:02x?}",
            scan.num_bits(),
            scan.tms(),
            scan.tdi()
        );
        let tdo = self.link.shift(scan.num_bits(), scan.tms(), scan.tdi())?;
        log::trace!("scan result: tdo={:02x?}", &tdo[..]);
        Ok(scan.capture(&tdo))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oracle_protocol::{Command, IDCODE, error::DecodeError};
    use oracle_sim::{IR_CAPTURE, SimLink, tap::TapState};

    use crate::error::Error;

    fn tap() -> Tap<SimLink> {
        let mut tap = Tap::new(SimLink::new());
        tap.reset_to_idle().unwrap();
        tap
    }

    #[test]
    fn reads_idcode() {
        let mut tap = tap();
        tap.shift_instruction(Command::Identification.opcode()).unwrap();
        assert_eq!(tap.shift_data(0, 32).unwrap(), IDCODE);
        assert_eq!(tap.link().state(), TapState::Idle);
    }

    #[test]
    fn instruction_shift_returns_capture_value() {
        let mut tap = tap();
        assert_eq!(
            tap.shift_instruction(Command::GetStatus.opcode()).unwrap(),
            IR_CAPTURE
        );
        assert_eq!(tap.link().instruction(), Command::GetStatus.opcode());
        assert_eq!(tap.link().state(), TapState::Idle);
    }

    #[test]
    fn reset_recovers_from_an_abandoned_scan() {
        let mut tap = tap();
        // Leave the controller in Shift-DR, as an interrupted scan would.
        for tms in [true, false, false] {
            tap.link_mut().pulse(tms, false).unwrap();
        }
        assert_eq!(tap.link().state(), TapState::ShiftDr);
        tap.reset_to_idle().unwrap();
        assert_eq!(tap.link().state(), TapState::Idle);
        assert_eq!(tap.shift_data(0, 32).unwrap(), IDCODE);
    }

    #[test]
    fn rejects_bad_widths_without_clocking() {
        let mut tap = tap();
        let before = tap.link().cycles();
        match tap.shift_data(0, 33) {
            Err(Error::Decode(DecodeError::InvalidWidth(33))) => {}
            other => panic!("expected InvalidWidth, got {:?}", other),
        }
        assert_eq!(tap.link().cycles(), before);
    }
}
