//! Board storage and attack generation of the device model.
use oracle_protocol::{Colour, Piece, PieceKind, Square};

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (-1, 1), (-1, -1), (1, -1)];

fn offset(square: Square, (file, rank): (i8, i8)) -> Option<Square> {
    let file = square.file().checked_add_signed(file)?;
    let rank = square.rank().checked_add_signed(rank)?;
    Square::from_coords(file, rank)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Board {
    cells: [Option<Piece>; 64],
}

impl Default for Board {
    fn default() -> Self {
        Board { cells: [None; 64] }
    }
}

impl Board {
    pub fn new() -> Board {
        Board::default()
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells[square.index() as usize]
    }

    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.cells[square.index() as usize] = piece;
    }

    /// Occupied squares in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|square| self.get(square).map(|piece| (square, piece)))
    }

    pub fn pieces(&self, colour: Colour) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.occupied().filter(move |(_, piece)| piece.colour == colour)
    }

    /// Squares attacked by whatever stands on `from`. Sliding pieces stop at
    /// the first occupied square, which is included.
    pub fn attacks(&self, from: Square) -> u64 {
        let Some(piece) = self.get(from) else {
            return 0;
        };
        match piece.kind {
            PieceKind::Pawn => {
                let forward = match piece.colour {
                    Colour::White => 1,
                    Colour::Black => -1,
                };
                self.steps(from, &[(-1, forward), (1, forward)])
            }
            PieceKind::Knight => self.steps(from, &KNIGHT_STEPS),
            PieceKind::King => self.steps(from, &KING_STEPS),
            PieceKind::Bishop => self.rays(from, &DIAGONAL),
            PieceKind::Rook => self.rays(from, &ORTHOGONAL),
            PieceKind::Queen => self.rays(from, &ORTHOGONAL) | self.rays(from, &DIAGONAL),
        }
    }

    fn steps(&self, from: Square, steps: &[(i8, i8)]) -> u64 {
        steps
            .iter()
            .filter_map(|&step| offset(from, step))
            .fold(0, |bits, square| bits | square.bit())
    }

    fn rays(&self, from: Square, directions: &[(i8, i8)]) -> u64 {
        let mut bits = 0;
        for &direction in directions {
            let mut current = from;
            while let Some(next) = offset(current, direction) {
                bits |= next.bit();
                if self.get(next).is_some() {
                    break;
                }
                current = next;
            }
        }
        bits
    }
}
