//! Shared fixtures for the cross-crate tests.
//!
//! Expected attack sets are computed independently of the device model, on
//! a 0x88 board: a square is `rank * 16 + file`, and any step that lands on
//! an index with `0x88` set has left the board.
use std::{
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
};

use oracle_client::Session;
use oracle_protocol::{PieceKind, Square};
use oracle_server::server::{Config, Server};
use oracle_sim::SimLink;

const KING: &[i16] = &[1, 15, 16, 17, -1, -15, -16, -17];
const ROOK: &[i16] = &[1, 16, -1, -16];
const BISHOP: &[i16] = &[15, 17, -15, -17];
const KNIGHT: &[i16] = &[33, 18, -18, -33, -31, -14, 14, 31];

fn to_0x88(square: Square) -> i16 {
    i16::from(square.rank()) * 16 + i16::from(square.file())
}

fn from_0x88(index: i16) -> Square {
    let index = index as u8;
    Square::new((index + (index & 7)) >> 1).expect("on-board 0x88 index")
}

fn steps(from: Square, offsets: &[i16]) -> Vec<Square> {
    offsets
        .iter()
        .map(|offset| to_0x88(from) + offset)
        .filter(|to| to & 0x88 == 0)
        .map(from_0x88)
        .collect()
}

fn slides(from: Square, offsets: &[i16]) -> Vec<Square> {
    let mut squares = Vec::new();
    for offset in offsets {
        let mut to = to_0x88(from) + offset;
        while to & 0x88 == 0 {
            squares.push(from_0x88(to));
            to += offset;
        }
    }
    squares
}

/// Squares a lone piece of `kind` on `from` attacks on an otherwise empty
/// board, sorted. Pawns are not covered.
pub fn empty_board_attacks(kind: PieceKind, from: Square) -> Vec<Square> {
    let mut squares = match kind {
        PieceKind::King => steps(from, KING),
        PieceKind::Knight => steps(from, KNIGHT),
        PieceKind::Rook => slides(from, ROOK),
        PieceKind::Bishop => slides(from, BISHOP),
        PieceKind::Queen => slides(from, KING),
        PieceKind::Pawn => panic!("pawn attacks depend on colour"),
    };
    squares.sort();
    squares
}

/// A session on a freshly powered device model.
pub fn sim_session() -> Session<SimLink> {
    Session::open(SimLink::new(), Default::default()).expect("device model identifies")
}

/// Serves a device model to exactly one XVC client on an ephemeral port.
///
/// The handle yields the model once the client disconnects.
pub fn serve_one_client(config: Config) -> (SocketAddr, JoinHandle<SimLink>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("bound address");
    let handle = thread::spawn(move || {
        let mut server = Server::new(SimLink::new(), config);
        let (tcp, _) = listener.accept().expect("client connects");
        server.handle_client(tcp).expect("client session");
        server.into_inner()
    });
    (addr, handle)
}

#[test]
fn offsets_match_hand_counts() {
    let d4: Square = "d4".parse().unwrap();
    let a1: Square = "a1".parse().unwrap();
    assert_eq!(empty_board_attacks(PieceKind::King, d4).len(), 8);
    assert_eq!(empty_board_attacks(PieceKind::King, a1).len(), 3);
    assert_eq!(empty_board_attacks(PieceKind::Knight, a1).len(), 2);
    assert_eq!(empty_board_attacks(PieceKind::Queen, d4).len(), 27);
    assert_eq!(empty_board_attacks(PieceKind::Rook, a1).len(), 14);
    assert_eq!(empty_board_attacks(PieceKind::Bishop, a1).len(), 7);
}
