//! Named register access on top of the TAP primitives.
use oracle_protocol::{
    Access, Colour, Command, IDCODE, Link, MaskMode, Piece, SQUARE_VALID, Square, StateMode,
    Status,
};

use crate::{
    error::{Error, Result},
    tap::Tap,
};

/// Reads and writes device registers by [`Command`].
///
/// Nothing is cached: every getter performs a fresh instruction and data scan.
pub struct Registers<L> {
    tap: Tap<L>,
}

impl<L: Link> Registers<L> {
    pub fn new(tap: Tap<L>) -> Registers<L> {
        Registers { tap }
    }

    pub fn tap(&mut self) -> &mut Tap<L> {
        &mut self.tap
    }

    pub fn into_inner(self) -> Tap<L> {
        self.tap
    }

    /// Selects `command` and, if it has a data phase, shifts `value` into it.
    pub fn write(&mut self, command: Command, value: u32) -> Result<()> {
        if command.access() != Access::Write {
            return Err(Error::NotWritable(command));
        }
        log::debug!("write {} = {:#x}", command, value);
        self.tap.shift_instruction(command.opcode())?;
        if let Some(width) = command.width() {
            self.tap.shift_data(value, width)?;
        }
        Ok(())
    }

    /// Selects `command` and shifts zeros through its data register.
    pub fn read(&mut self, command: Command) -> Result<u32> {
        let width = match (command.access(), command.width()) {
            (Access::Read, Some(width)) => width,
            _ => return Err(Error::NotReadable(command)),
        };
        self.tap.shift_instruction(command.opcode())?;
        let value = self.tap.shift_data(0, width)?;
        log::debug!("read {} = {:#x}", command, value);
        Ok(value)
    }

    pub fn idcode(&mut self) -> Result<u32> {
        self.read(Command::Identification)
    }

    /// Reads the IDCODE and fails unless it equals `expected`.
    pub fn check_idcode(&mut self, expected: u32) -> Result<()> {
        let got = self.idcode()?;
        if got != expected {
            log::error!("IDCODE {:#010x} does not match {:#010x}", got, expected);
            return Err(Error::IdMismatch { expected, got });
        }
        log::info!("attack oracle identified (IDCODE {:#010x})", got);
        Ok(())
    }

    /// Raw status, running whatever query the current state mode selects.
    pub fn raw_status(&mut self) -> Result<u8> {
        Ok(self.read(Command::GetStatus)? as u8)
    }

    pub fn status(&mut self) -> Result<Status> {
        let raw = self.raw_status()?;
        if raw & Status::EXHAUSTED != 0 && raw & !(Status::EXHAUSTED | Status::FAULT) != 0 {
            log::warn!("exhausted status {:#04x} carries index bits", raw);
        }
        Ok(Status::decode(raw))
    }

    pub fn set_side_to_move(&mut self, colour: Colour) -> Result<()> {
        self.write(Command::SetThreshold, u32::from(colour.bit()))
    }

    pub fn side_to_move(&mut self) -> Result<Colour> {
        Ok(Colour::from_bit(self.read(Command::GetThreshold)? as u8))
    }

    pub fn set_mask_mode(&mut self, mode: MaskMode) -> Result<()> {
        self.write(Command::SetMaskMode, u32::from(mode.bits()))
    }

    pub fn mask_mode(&mut self) -> Result<MaskMode> {
        Ok(MaskMode::try_from(self.read(Command::GetMaskMode)? as u8)?)
    }

    pub fn set_state_mode(&mut self, mode: StateMode) -> Result<()> {
        self.write(Command::SetStateMode, u32::from(mode.bits()))
    }

    pub fn state_mode(&mut self) -> Result<StateMode> {
        Ok(StateMode::try_from(self.read(Command::GetStateMode)? as u8)?)
    }

    pub fn set_write_bus(&mut self, value: u8) -> Result<()> {
        self.write(Command::SetWriteBus, u32::from(value))
    }

    pub fn write_bus(&mut self) -> Result<u8> {
        Ok(self.read(Command::GetWriteBus)? as u8)
    }

    /// Selects `square` in the first selector and marks it valid.
    pub fn set_first_square(&mut self, square: Square) -> Result<()> {
        self.write(Command::SetFirstSquare, u32::from(square.index() | SQUARE_VALID))
    }

    /// The first selector, or `None` while it is not valid.
    pub fn first_square(&mut self) -> Result<Option<Square>> {
        let raw = self.read(Command::GetFirstSquare)? as u8;
        if raw & SQUARE_VALID == 0 {
            return Ok(None);
        }
        Ok(Some(Square::try_from(raw & !SQUARE_VALID)?))
    }

    pub fn set_second_square(&mut self, square: Square) -> Result<()> {
        self.write(Command::SetSecondSquare, u32::from(square.index() | SQUARE_VALID))
    }

    /// Marks the first selector valid without changing its square.
    pub fn assert_first_valid(&mut self) -> Result<()> {
        self.write(Command::SetFirstValid, 0)
    }

    pub fn assert_second_valid(&mut self) -> Result<()> {
        self.write(Command::SetSecondValid, 0)
    }

    pub fn first_valid(&mut self) -> Result<bool> {
        Ok(self.read(Command::GetFirstValid)? & 1 == 1)
    }

    pub fn second_valid(&mut self) -> Result<bool> {
        Ok(self.read(Command::GetSecondValid)? & 1 == 1)
    }

    /// Stores `piece` (or an empty square) on the board.
    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) -> Result<()> {
        log::debug!(
            "place {} on {}",
            piece.map_or("empty".to_string(), |p| p.to_string()),
            square
        );
        self.set_first_square(square)?;
        self.set_write_bus(Piece::encode(piece))?;
        self.set_state_mode(StateMode::Write)
    }

    pub fn clear_square(&mut self, square: Square) -> Result<()> {
        self.set_piece(square, None)
    }

    /// Resets the TAP and verifies the device is the expected build.
    pub fn bring_up(&mut self, expected_idcode: u32) -> Result<()> {
        self.tap.reset_to_idle()?;
        self.check_idcode(expected_idcode)
    }

    /// [`Registers::bring_up`] against the known attack oracle IDCODE.
    pub fn bring_up_default(&mut self) -> Result<()> {
        self.bring_up(IDCODE)
    }
}
