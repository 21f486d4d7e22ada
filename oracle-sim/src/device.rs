//! Register file and query engine behind the TAP.
use oracle_protocol::{
    Colour, Command, IDCODE, MaskMode, Piece, SQUARE_VALID, Square, StateMode, Status,
};

use crate::board::Board;

const BYPASS_WIDTH: u8 = 1;

/// Everything the device remembers between scans.
///
/// Find queries run when the status register is captured. Writes take effect
/// on Update-DR: a mask mode write applies to the square in the first
/// selector, a state mode write of [`StateMode::Write`] stores the write bus
/// at the first selector.
#[derive(Clone, Debug)]
pub struct Device {
    board: Board,
    side_to_move: Colour,
    first: u8,
    second: u8,
    mask_mode: u8,
    state_mode: u8,
    write_bus: u8,
    /// Squares retired from victim scans.
    retired_victims: u64,
    /// Squares retired from aggressor scans.
    retired_aggressors: u64,
    /// Raw status overrides per state mode, for fault injection.
    forced: [Option<u8>; 8],
}

impl Default for Device {
    fn default() -> Self {
        Device {
            board: Board::new(),
            side_to_move: Colour::White,
            first: 0,
            second: 0,
            mask_mode: MaskMode::NoChange.bits(),
            state_mode: StateMode::Idle.bits(),
            write_bus: Piece::EMPTY,
            retired_victims: 0,
            retired_aggressors: 0,
            forced: [None; 8],
        }
    }
}

fn selected(selector: u8) -> Option<Square> {
    if selector & SQUARE_VALID == 0 {
        return None;
    }
    Square::new(selector & !SQUARE_VALID)
}

impl Device {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Colour {
        self.side_to_move
    }

    /// Squares currently excluded from victim scans.
    pub fn retired_victims(&self) -> u64 {
        self.retired_victims
    }

    /// Squares currently excluded from aggressor scans.
    pub fn retired_aggressors(&self) -> u64 {
        self.retired_aggressors
    }

    /// Makes every status read under `mode` return `raw` instead of running
    /// the query. `None` restores normal behaviour.
    pub fn force_status(&mut self, mode: StateMode, raw: Option<u8>) {
        self.forced[mode.bits() as usize] = raw;
    }

    /// Called on Update-IR.
    pub fn update_instruction(&mut self, opcode: u8) {
        match Command::from_opcode(opcode) {
            Some(Command::SetFirstValid) => self.first |= SQUARE_VALID,
            Some(Command::SetSecondValid) => self.second |= SQUARE_VALID,
            _ => {}
        }
    }

    /// Called on Capture-DR. Returns the value loaded into the data register
    /// and the register's width.
    pub fn capture(&mut self, opcode: u8) -> (u32, u8) {
        let Some(command) = Command::from_opcode(opcode) else {
            return (0, BYPASS_WIDTH);
        };
        let Some(width) = command.width() else {
            return (0, BYPASS_WIDTH);
        };
        let value = match command {
            Command::Identification => IDCODE,
            Command::GetStatus => {
                let status = match self.forced[self.state_mode as usize] {
                    Some(raw) => raw,
                    None => self.query().encode(),
                };
                log::trace!("status query {:#05b} -> {:#04x}", self.state_mode, status);
                u32::from(status)
            }
            Command::SetThreshold | Command::GetThreshold => u32::from(self.side_to_move.bit()),
            Command::GetFirstValid => u32::from(self.first >> 6),
            Command::GetSecondValid => u32::from(self.second >> 6),
            Command::SetFirstSquare | Command::GetFirstSquare => u32::from(self.first),
            Command::SetSecondSquare => u32::from(self.second),
            Command::SetMaskMode | Command::GetMaskMode => u32::from(self.mask_mode),
            Command::SetStateMode | Command::GetStateMode => u32::from(self.state_mode),
            Command::SetWriteBus | Command::GetWriteBus => u32::from(self.write_bus),
            Command::SetFirstValid | Command::SetSecondValid => 0,
        };
        (value, width)
    }

    /// Called on Update-DR with the shifted-in value.
    pub fn update(&mut self, opcode: u8, value: u32) {
        let Some(command) = Command::from_opcode(opcode) else {
            return;
        };
        let value = value as u8;
        match command {
            Command::SetThreshold => self.side_to_move = Colour::from_bit(value),
            Command::SetFirstSquare => self.first = value & 0x7F,
            Command::SetSecondSquare => self.second = value & 0x7F,
            Command::SetWriteBus => self.write_bus = value & 0xF,
            Command::SetMaskMode => {
                self.mask_mode = value & 0b11;
                self.apply_mask();
            }
            Command::SetStateMode => {
                self.state_mode = value & 0b111;
                self.apply_state();
            }
            _ => {}
        }
    }

    fn apply_mask(&mut self) {
        let Ok(mode) = MaskMode::try_from(self.mask_mode) else {
            return;
        };
        let target = selected(self.first).map_or(0, Square::bit);
        match mode {
            MaskMode::EnableAll => {
                self.retired_victims = 0;
                self.retired_aggressors = 0;
            }
            MaskMode::DisableVictim => {
                self.retired_victims |= target;
                self.retired_aggressors = 0;
            }
            MaskMode::DisableAggressor => self.retired_aggressors |= target,
            MaskMode::NoChange => {}
        }
    }

    fn apply_state(&mut self) {
        let target = match StateMode::try_from(self.state_mode) {
            Ok(StateMode::Write) => selected(self.first),
            Ok(StateMode::WriteDirect) => selected(self.second),
            _ => return,
        };
        let Some(square) = target else {
            log::warn!("write with no valid square selected");
            return;
        };
        match Piece::decode(self.write_bus) {
            Ok(piece) => {
                log::debug!("board[{}] <- {:?}", square, piece);
                self.board.set(square, piece);
            }
            Err(e) => log::warn!("ignoring write of {}", e),
        }
    }

    /// Squares attacked by the side to move through aggressors that have not been retired.
    fn attacked(&self) -> u64 {
        self.board
            .pieces(self.side_to_move)
            .filter(|(square, _)| self.retired_aggressors & square.bit() == 0)
            .fold(0, |bits, (square, _)| bits | self.board.attacks(square))
    }

    fn query(&mut self) -> Status {
        let Ok(mode) = StateMode::try_from(self.state_mode) else {
            return Status::Fault(Status::FAULT);
        };
        let found = match mode {
            StateMode::FindVictim => self.find_victim(),
            StateMode::FindAggressor => match selected(self.first) {
                Some(victim) => self.find_aggressor(victim),
                None => return Status::Fault(Status::FAULT),
            },
            StateMode::FindPiece => self
                .board
                .pieces(self.side_to_move)
                .map(|(square, _)| square)
                .find(|square| self.retired_aggressors & square.bit() == 0),
            StateMode::DirectAutoAdvance => self.advance(),
            StateMode::Idle | StateMode::Write | StateMode::WriteDirect => None,
        };
        found.map_or(Status::Exhausted, Status::Found)
    }

    /// Most valuable victim first, empty squares last, ties by lowest index.
    fn find_victim(&self) -> Option<Square> {
        let own = self
            .board
            .pieces(self.side_to_move)
            .fold(0, |bits, (square, _)| bits | square.bit());
        let candidates = self.attacked() & !own & !self.retired_victims;
        Square::all()
            .filter(|square| candidates & square.bit() != 0)
            .min_by_key(|&square| {
                let value = self.board.get(square).map_or(0, |piece| piece.kind.value());
                (u32::MAX - value, square.index())
            })
    }

    /// Least valuable aggressor first, ties by lowest index.
    fn find_aggressor(&self, victim: Square) -> Option<Square> {
        self.board
            .pieces(self.side_to_move)
            .filter(|(square, _)| self.retired_aggressors & square.bit() == 0)
            .filter(|(square, _)| self.board.attacks(*square) & victim.bit() != 0)
            .min_by_key(|(square, piece)| (piece.kind.value(), square.index()))
            .map(|(square, _)| square)
    }

    /// Next occupied square at or after the first selector, which then moves past it.
    fn advance(&mut self) -> Option<Square> {
        let start = selected(self.first)?;
        let found = self
            .board
            .occupied()
            .map(|(square, _)| square)
            .find(|square| *square >= start)?;
        self.first = match Square::new(found.index() + 1) {
            Some(next) => next.index() | SQUARE_VALID,
            None => 0,
        };
        Some(found)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn write(device: &mut Device, command: Command, value: u32) {
        device.update_instruction(command.opcode());
        device.update(command.opcode(), value);
    }

    fn status(device: &mut Device) -> Status {
        Status::decode(device.capture(Command::GetStatus.opcode()).0 as u8)
    }

    fn place(device: &mut Device, name: &str, piece: &str) {
        let piece: Piece = piece.parse().unwrap();
        write(device, Command::SetFirstSquare, u32::from(square(name).index() | SQUARE_VALID));
        write(device, Command::SetWriteBus, u32::from(piece.code()));
        write(device, Command::SetStateMode, u32::from(StateMode::Write.bits()));
    }

    #[test]
    fn writes_pieces_through_the_write_bus() {
        let mut device = Device::default();
        place(&mut device, "e1", "K");
        assert_eq!(device.board().get(square("e1")), Some("K".parse().unwrap()));
    }

    #[test]
    fn most_valuable_victim_least_valuable_aggressor() {
        let mut device = Device::default();
        place(&mut device, "d4", "N");
        place(&mut device, "e6", "q");
        place(&mut device, "c6", "r");
        place(&mut device, "e1", "R");
        write(&mut device, Command::SetStateMode, u32::from(StateMode::FindVictim.bits()));
        assert_eq!(status(&mut device), Status::Found(square("e6")));

        write(&mut device, Command::SetFirstSquare, u32::from(square("e6").index() | SQUARE_VALID));
        write(&mut device, Command::SetStateMode, u32::from(StateMode::FindAggressor.bits()));
        assert_eq!(status(&mut device), Status::Found(square("d4")));
    }

    #[test]
    fn find_aggressor_without_selection_faults() {
        let mut device = Device::default();
        write(&mut device, Command::SetStateMode, u32::from(StateMode::FindAggressor.bits()));
        assert_eq!(status(&mut device), Status::Fault(Status::FAULT));
    }

    #[test]
    fn masks_retire_squares() {
        let mut device = Device::default();
        place(&mut device, "a1", "N");
        write(&mut device, Command::SetFirstSquare, u32::from(square("b3").index() | SQUARE_VALID));
        write(&mut device, Command::SetMaskMode, u32::from(MaskMode::DisableVictim.bits()));
        write(&mut device, Command::SetStateMode, u32::from(StateMode::FindVictim.bits()));
        assert_eq!(status(&mut device), Status::Found(square("c2")));

        write(&mut device, Command::SetFirstSquare, u32::from(square("a1").index() | SQUARE_VALID));
        write(&mut device, Command::SetMaskMode, u32::from(MaskMode::DisableAggressor.bits()));
        assert_eq!(status(&mut device), Status::Exhausted);

        write(&mut device, Command::SetMaskMode, u32::from(MaskMode::EnableAll.bits()));
        assert_eq!(status(&mut device), Status::Found(square("c2")));
        write(&mut device, Command::SetFirstSquare, u32::from(square("c2").index() | SQUARE_VALID));
        write(&mut device, Command::SetMaskMode, u32::from(MaskMode::DisableVictim.bits()));
        assert_eq!(status(&mut device), Status::Found(square("b3")));
    }

    #[test]
    fn valid_flag_instructions() {
        let mut device = Device::default();
        device.update_instruction(Command::SetFirstValid.opcode());
        assert_eq!(device.capture(Command::GetFirstValid.opcode()), (1, 1));
        assert_eq!(device.capture(Command::GetSecondValid.opcode()), (0, 1));
    }

    #[test]
    fn direct_auto_advance_walks_occupied_squares() {
        let mut device = Device::default();
        place(&mut device, "c1", "B");
        place(&mut device, "h8", "k");
        write(&mut device, Command::SetFirstSquare, u32::from(SQUARE_VALID));
        write(&mut device, Command::SetStateMode, u32::from(StateMode::DirectAutoAdvance.bits()));
        assert_eq!(status(&mut device), Status::Found(square("c1")));
        assert_eq!(status(&mut device), Status::Found(square("h8")));
        assert_eq!(status(&mut device), Status::Exhausted);
    }

    #[test]
    fn unknown_opcodes_select_bypass() {
        let mut device = Device::default();
        assert_eq!(device.capture(0x42), (0, 1));
        assert_eq!(device.capture(Command::Identification.opcode()), (IDCODE, 32));
    }
}
