//! # Attack Oracle Device Model
//!
//! A software stand-in for the attack oracle, driven through the same
//! [`Link`] contract as the real hardware. It is used by the client test
//! suites and can be served over XVC for manual experiments.
//!
//! ## What Is Modelled
//!
//! - The full 16-state TAP controller ([`tap::TapState`]), with an 8-bit
//!   instruction register that captures `0b01`, resets to IDCODE, and data
//!   registers whose widths follow the opcode table.
//! - The register file and query engine ([`device::Device`]): side to move,
//!   square selectors, write bus, mask and state modes, and victim/aggressor
//!   searches ranked most valuable victim first, least valuable aggressor
//!   first.
//! - Time: every pulse advances a cycle counter by two half periods.
//!
//! The model makes no claim to match the hardware's arbitration order. The
//! client must not depend on the order in which victims are reported.
//!
//! ## Example
//!
//! ```
//! use oracle_protocol::{Link, codec::Scan};
//! use oracle_sim::SimLink;
//!
//! let mut link = SimLink::new();
//! let reset = Scan::reset();
//! link.shift(reset.num_bits(), reset.tms(), reset.tdi()).unwrap();
//! assert!(link.cycles() > 0);
//! ```
pub mod board;
pub mod device;
pub mod tap;

use std::io;

use oracle_protocol::{Command, Link};

use crate::{device::Device, tap::TapState};

/// Value loaded into the instruction shift register on Capture-IR.
pub const IR_CAPTURE: u8 = 0b0000_0001;

/// System clock cycles per TCK half period.
pub const DEFAULT_HALF_PERIOD: u64 = 8;

/// A [`Device`] behind a bit-accurate TAP controller.
#[derive(Clone, Debug)]
pub struct SimLink {
    state: TapState,
    instruction: u8,
    ir_shift: u8,
    dr_shift: u32,
    dr_width: u8,
    device: Device,
    half_period: u64,
    cycles: u64,
}

impl Default for SimLink {
    fn default() -> Self {
        SimLink::new()
    }
}

impl SimLink {
    /// A freshly powered device: TAP in Test-Logic-Reset, empty board.
    pub fn new() -> SimLink {
        SimLink::with_half_period(DEFAULT_HALF_PERIOD)
    }

    pub fn with_half_period(half_period: u64) -> SimLink {
        SimLink {
            state: TapState::Reset,
            instruction: Command::Identification.opcode(),
            ir_shift: 0,
            dr_shift: 0,
            dr_width: 1,
            device: Device::default(),
            half_period,
            cycles: 0,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// The instruction latched by the last Update-IR.
    pub fn instruction(&self) -> u8 {
        self.instruction
    }

    /// System clock cycles elapsed since power-up.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn tdo(&self) -> bool {
        match self.state {
            TapState::ShiftIr => self.ir_shift & 1 == 1,
            TapState::ShiftDr => self.dr_shift & 1 == 1,
            _ => false,
        }
    }

    fn rising_edge(&mut self, tdi: bool) {
        match self.state {
            TapState::CaptureIr => self.ir_shift = IR_CAPTURE,
            TapState::ShiftIr => self.ir_shift = (self.ir_shift >> 1) | (u8::from(tdi) << 7),
            TapState::CaptureDr => {
                let (value, width) = self.device.capture(self.instruction);
                self.dr_shift = value;
                self.dr_width = width;
            }
            TapState::ShiftDr => {
                self.dr_shift = (self.dr_shift >> 1) | (u32::from(tdi) << (self.dr_width - 1));
            }
            _ => {}
        }
    }

    fn enter(&mut self, next: TapState) {
        match next {
            TapState::Reset => self.instruction = Command::Identification.opcode(),
            TapState::UpdateIr => {
                self.instruction = self.ir_shift;
                log::trace!("IR <- {:#04x}", self.instruction);
                self.device.update_instruction(self.instruction);
            }
            TapState::UpdateDr => {
                log::trace!("DR[{:#04x}] <- {:#x}", self.instruction, self.dr_shift);
                self.device.update(self.instruction, self.dr_shift);
            }
            _ => {}
        }
        self.state = next;
    }
}

impl Link for SimLink {
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool> {
        self.cycles += 2 * self.half_period;
        let tdo = self.tdo();
        self.rising_edge(tdi);
        let next = self.state.next(tms);
        self.enter(next);
        Ok(tdo)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oracle_protocol::{IDCODE, codec::Scan};

    fn run(link: &mut SimLink, scan: &Scan) -> u32 {
        let tdo = link.shift(scan.num_bits(), scan.tms(), scan.tdi()).unwrap();
        scan.capture(&tdo)
    }

    #[test]
    fn idcode_after_reset() {
        let mut link = SimLink::new();
        run(&mut link, &Scan::reset());
        assert_eq!(link.state(), TapState::Idle);
        assert_eq!(link.instruction(), Command::Identification.opcode());
        assert_eq!(run(&mut link, &Scan::data(0, 32).unwrap()), IDCODE);
        assert_eq!(link.state(), TapState::Idle);
    }

    #[test]
    fn instruction_scan_returns_capture_pattern() {
        let mut link = SimLink::new();
        run(&mut link, &Scan::reset());
        let captured = run(&mut link, &Scan::instruction(Command::GetMaskMode.opcode()));
        assert_eq!(captured, u32::from(IR_CAPTURE));
        assert_eq!(link.instruction(), Command::GetMaskMode.opcode());
    }

    #[test]
    fn data_scan_returns_previous_contents() {
        let mut link = SimLink::new();
        run(&mut link, &Scan::reset());
        run(&mut link, &Scan::instruction(Command::SetWriteBus.opcode()));
        run(&mut link, &Scan::data(0b1010, 4).unwrap());
        assert_eq!(run(&mut link, &Scan::data(0b0101, 4).unwrap()), 0b1010);
    }

    #[test]
    fn pulses_advance_time() {
        let mut link = SimLink::with_half_period(3);
        link.pulse(true, false).unwrap();
        link.pulse(true, false).unwrap();
        assert_eq!(link.cycles(), 12);
    }
}
