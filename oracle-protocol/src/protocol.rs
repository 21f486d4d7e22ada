use std::{fmt::Display, str::FromStr};

use crate::error::DecodeError;

/// The IDCODE the attack oracle reports after a TAP reset.
pub const IDCODE: u32 = 0x1392_001d;

/// Number of squares on the board.
pub const NUM_SQUARES: u8 = 64;

/// Bit set on a square selector write to mark the selector as valid.
pub const SQUARE_VALID: u8 = 0x40;

/// A square on the board, indexed as `rank * 8 + file`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Square(u8);

impl Square {
    /// Creates a square from its index, or `None` if the index is off the board.
    pub const fn new(index: u8) -> Option<Square> {
        if index < NUM_SQUARES {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Creates a square from a file (0 = a) and rank (0 = 1).
    pub const fn from_coords(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    /// The single-bit board mask for this square.
    pub fn bit(self) -> u64 {
        1 << self.0
    }

    /// All squares in index order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES).map(Square)
    }
}

impl TryFrom<u8> for Square {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Square::new(value).ok_or(DecodeError::InvalidSquare(value))
    }
}

impl From<Square> for u8 {
    fn from(value: Square) -> Self {
        value.0
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file()),
            char::from(b'1' + self.rank())
        )
    }
}

/// Parses either algebraic notation (`d4`) or a plain index (`27`).
impl FromStr for Square {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<u8>() {
            return Square::try_from(index);
        }
        match s.as_bytes() {
            [file @ b'a'..=b'h', rank @ b'1'..=b'8'] => {
                Ok(Square((rank - b'1') * 8 + (file - b'a')))
            }
            _ => Err(DecodeError::InvalidSquareName(s.to_string())),
        }
    }
}

#[test]
fn square_names() {
    let d4 = Square::new(27).unwrap();
    assert_eq!(d4.to_string(), "d4");
    assert_eq!("d4".parse::<Square>().unwrap(), d4);
    assert_eq!("27".parse::<Square>().unwrap(), d4);
    assert_eq!(Square::from_coords(3, 3), Some(d4));
    assert!("i1".parse::<Square>().is_err());
    assert!(Square::try_from(64).is_err());
}

/// The side to move, written through the 1-bit threshold register.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Colour {
    #[default]
    White = 0,
    Black = 1,
}

impl Colour {
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn from_bit(bit: u8) -> Colour {
        if bit & 1 == 0 {
            Colour::White
        } else {
            Colour::Black
        }
    }

    /// The other side.
    pub fn opponent(self) -> Colour {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }
}

impl Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colour::White => write!(f, "white"),
            Colour::Black => write!(f, "black"),
        }
    }
}

impl FromStr for Colour {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" | "w" => Ok(Colour::White),
            "black" | "b" => Ok(Colour::Black),
            _ => Err(DecodeError::InvalidColour(s.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Conventional material value, used to rank victims and aggressors.
    pub fn value(self) -> u32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Knight | PieceKind::Bishop => 3,
            PieceKind::Rook => 5,
            PieceKind::Queen => 9,
            PieceKind::King => 100,
        }
    }

    fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

/// A piece as stored in one 4-bit board cell: `colour << 3 | kind`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub colour: Colour,
}

impl Piece {
    /// Board code of an empty square.
    pub const EMPTY: u8 = 0xF;

    pub fn new(kind: PieceKind, colour: Colour) -> Piece {
        Piece { kind, colour }
    }

    pub fn code(self) -> u8 {
        (self.colour.bit() << 3) | self.kind as u8
    }

    /// Encodes an optional piece, using [`Piece::EMPTY`] for `None`.
    pub fn encode(piece: Option<Piece>) -> u8 {
        piece.map_or(Piece::EMPTY, Piece::code)
    }

    /// Decodes a board cell; [`Piece::EMPTY`] yields `None`.
    pub fn decode(code: u8) -> Result<Option<Piece>, DecodeError> {
        if code == Piece::EMPTY {
            return Ok(None);
        }
        if code > 0xF {
            return Err(DecodeError::InvalidPieceCode(code));
        }
        let kind = match code & 0x7 {
            0 => PieceKind::Pawn,
            1 => PieceKind::Knight,
            2 => PieceKind::Bishop,
            3 => PieceKind::Rook,
            4 => PieceKind::Queen,
            5 => PieceKind::King,
            _ => return Err(DecodeError::InvalidPieceCode(code)),
        };
        Ok(Some(Piece::new(kind, Colour::from_bit(code >> 3))))
    }
}

/// FEN letters: upper case for white, lower case for black.
impl Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = self.kind.letter();
        match self.colour {
            Colour::White => write!(f, "{}", letter.to_ascii_uppercase()),
            Colour::Black => write!(f, "{}", letter),
        }
    }
}

impl FromStr for Piece {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            return Err(DecodeError::InvalidPieceName(s.to_string()));
        };
        let kind = PieceKind::ALL
            .into_iter()
            .find(|kind| kind.letter() == letter.to_ascii_lowercase())
            .ok_or_else(|| DecodeError::InvalidPieceName(s.to_string()))?;
        let colour = if letter.is_ascii_uppercase() {
            Colour::White
        } else {
            Colour::Black
        };
        Ok(Piece::new(kind, colour))
    }
}

#[test]
fn piece_codes() {
    let black_king = Piece::new(PieceKind::King, Colour::Black);
    assert_eq!(black_king.code(), 13);
    assert_eq!(Piece::decode(13), Ok(Some(black_king)));
    assert_eq!(Piece::decode(Piece::EMPTY), Ok(None));
    assert_eq!(Piece::decode(6), Err(DecodeError::InvalidPieceCode(6)));
    assert_eq!(Piece::decode(14), Err(DecodeError::InvalidPieceCode(14)));
    assert_eq!("k".parse::<Piece>().unwrap(), black_king);
    assert_eq!(black_king.to_string(), "k");
    assert_eq!("N".parse::<Piece>().unwrap().code(), 1);
}

/// Controls which squares take part in the next find query.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MaskMode {
    /// Enable every victim and every aggressor.
    EnableAll = 0b00,
    /// Retire the victim at the first square, re-enable all aggressors.
    DisableVictim = 0b01,
    /// Retire the aggressor at the first square.
    DisableAggressor = 0b10,
    /// Leave eligibility untouched.
    NoChange = 0b11,
}

impl MaskMode {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MaskMode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(MaskMode::EnableAll),
            0b01 => Ok(MaskMode::DisableVictim),
            0b10 => Ok(MaskMode::DisableAggressor),
            0b11 => Ok(MaskMode::NoChange),
            _ => Err(DecodeError::InvalidMaskMode(value)),
        }
    }
}

/// Selects the query or operation the device performs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StateMode {
    FindVictim = 0b000,
    FindPiece = 0b001,
    FindAggressor = 0b010,
    Idle = 0b100,
    DirectAutoAdvance = 0b101,
    Write = 0b110,
    WriteDirect = 0b111,
}

impl StateMode {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for StateMode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b000 => Ok(StateMode::FindVictim),
            0b001 => Ok(StateMode::FindPiece),
            0b010 => Ok(StateMode::FindAggressor),
            0b100 => Ok(StateMode::Idle),
            0b101 => Ok(StateMode::DirectAutoAdvance),
            0b110 => Ok(StateMode::Write),
            0b111 => Ok(StateMode::WriteDirect),
            _ => Err(DecodeError::InvalidStateMode(value)),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Access {
    Write,
    Read,
}

/// Every instruction the attack oracle understands, with its opcode and
/// data register width.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    SetThreshold,
    SetFirstValid,
    SetSecondValid,
    SetMaskMode,
    SetStateMode,
    SetWriteBus,
    SetFirstSquare,
    SetSecondSquare,
    GetThreshold,
    GetFirstValid,
    GetFirstSquare,
    GetSecondValid,
    GetMaskMode,
    GetStateMode,
    GetWriteBus,
    GetStatus,
    Identification,
}

impl Command {
    pub const ALL: [Command; 17] = [
        Command::SetThreshold,
        Command::SetFirstValid,
        Command::SetSecondValid,
        Command::SetMaskMode,
        Command::SetStateMode,
        Command::SetWriteBus,
        Command::SetFirstSquare,
        Command::SetSecondSquare,
        Command::GetThreshold,
        Command::GetFirstValid,
        Command::GetFirstSquare,
        Command::GetSecondValid,
        Command::GetMaskMode,
        Command::GetStateMode,
        Command::GetWriteBus,
        Command::GetStatus,
        Command::Identification,
    ];

    pub fn opcode(self) -> u8 {
        match self {
            Command::SetThreshold => 0x00,
            Command::SetFirstValid => 0x04,
            Command::SetSecondValid => 0x06,
            Command::SetMaskMode => 0x08,
            Command::SetStateMode => 0x10,
            Command::SetWriteBus => 0x20,
            Command::SetFirstSquare => 0x80,
            Command::SetSecondSquare => 0xC0,
            Command::GetThreshold => 0x40,
            Command::GetFirstValid => 0x44,
            Command::GetFirstSquare => 0x45,
            Command::GetSecondValid => 0x46,
            Command::GetStatus => 0x47,
            Command::GetMaskMode => 0x48,
            Command::GetStateMode => 0x50,
            Command::GetWriteBus => 0x60,
            Command::Identification => 0xFE,
        }
    }

    /// Width of the data phase, or `None` for instructions that act on their own.
    pub fn width(self) -> Option<u8> {
        match self {
            Command::SetFirstValid | Command::SetSecondValid => None,
            Command::SetThreshold
            | Command::GetThreshold
            | Command::GetFirstValid
            | Command::GetSecondValid => Some(1),
            Command::SetMaskMode | Command::GetMaskMode => Some(2),
            Command::SetStateMode | Command::GetStateMode => Some(3),
            Command::SetWriteBus | Command::GetWriteBus => Some(4),
            Command::SetFirstSquare
            | Command::SetSecondSquare
            | Command::GetFirstSquare => Some(7),
            // Square index plus the exhausted and fault flags.
            Command::GetStatus => Some(8),
            Command::Identification => Some(32),
        }
    }

    pub fn access(self) -> Access {
        match self {
            Command::SetThreshold
            | Command::SetFirstValid
            | Command::SetSecondValid
            | Command::SetMaskMode
            | Command::SetStateMode
            | Command::SetWriteBus
            | Command::SetFirstSquare
            | Command::SetSecondSquare => Access::Write,
            _ => Access::Read,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Command> {
        Command::ALL
            .into_iter()
            .find(|command| command.opcode() == opcode)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#04x})", self, self.opcode())
    }
}

#[test]
fn opcodes_are_unique() {
    for (i, a) in Command::ALL.iter().enumerate() {
        for b in &Command::ALL[i + 1..] {
            assert_ne!(a.opcode(), b.opcode(), "{a:?} and {b:?} share an opcode");
        }
        assert_eq!(Command::from_opcode(a.opcode()), Some(*a));
    }
    assert_eq!(Command::from_opcode(0x42), None);
}

#[test]
fn status_read_carries_the_fault_bit() {
    let width = Command::GetStatus.width().unwrap();
    assert!(u32::from(Status::FAULT) < 1 << width);
    assert_eq!(Command::GetFirstSquare.width(), Some(7));
}

/// Decoded result of a status read.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// The query matched this square.
    Found(Square),
    /// No square matches the query any more.
    Exhausted,
    /// The device flagged an error; carries the raw status.
    Fault(u8),
}

impl Status {
    pub const FAULT: u8 = 0x80;
    pub const EXHAUSTED: u8 = 0x40;
    const INDEX_MASK: u8 = 0x3F;

    /// Decodes a raw status value. The fault bit wins over the exhausted bit.
    pub fn decode(raw: u8) -> Status {
        if raw & Status::FAULT != 0 {
            Status::Fault(raw)
        } else if raw & Status::EXHAUSTED != 0 {
            Status::Exhausted
        } else {
            Status::Found(Square(raw & Status::INDEX_MASK))
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            Status::Found(square) => square.index(),
            Status::Exhausted => Status::EXHAUSTED,
            Status::Fault(raw) => raw | Status::FAULT,
        }
    }
}

#[test]
fn status_sentinels() {
    assert_eq!(Status::decode(0x40), Status::Exhausted);
    assert_eq!(Status::decode(0x80), Status::Fault(0x80));
    assert_eq!(Status::decode(0xC0), Status::Fault(0xC0));
    assert_eq!(Status::decode(0x3F), Status::Found(Square(63)));
    assert_eq!(Status::decode(0), Status::Found(Square(0)));
    assert_eq!(Status::Exhausted.encode(), 0x40);
}
