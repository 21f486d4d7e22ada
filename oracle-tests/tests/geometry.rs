//! Every non-pawn piece on every square of an empty board, for both sides.
use oracle_client::Session;
use oracle_protocol::{Colour, Piece, PieceKind, Square};
use oracle_sim::SimLink;
use oracle_tests::{empty_board_attacks, sim_session};

fn sweep(session: &mut Session<SimLink>, kind: PieceKind) {
    for square in Square::all() {
        let expected = empty_board_attacks(kind, square);
        for colour in [Colour::White, Colour::Black] {
            session
                .set_piece(square, Some(Piece::new(kind, colour)))
                .unwrap();
            session.set_side_to_move(colour).unwrap();
            let mut victims = session.enumerate().unwrap();
            victims.sort();
            assert_eq!(victims, expected, "{:?} {:?} on {}", colour, kind, square);
            session.set_side_to_move(colour.opponent()).unwrap();
            assert!(session.enumerate().unwrap().is_empty());
        }
        session.set_piece(square, None).unwrap();
    }
}

#[test]
fn king_sweep() {
    sweep(&mut sim_session(), PieceKind::King);
}

#[test]
fn queen_sweep() {
    sweep(&mut sim_session(), PieceKind::Queen);
}

#[test]
fn rook_sweep() {
    sweep(&mut sim_session(), PieceKind::Rook);
}

#[test]
fn bishop_sweep() {
    sweep(&mut sim_session(), PieceKind::Bishop);
}

#[test]
fn knight_sweep() {
    sweep(&mut sim_session(), PieceKind::Knight);
}

#[test]
fn opponent_pieces_do_not_attack() {
    let mut session = sim_session();
    let d4: Square = "d4".parse().unwrap();
    session
        .set_piece(d4, Some(Piece::new(PieceKind::Queen, Colour::Black)))
        .unwrap();
    session.set_side_to_move(Colour::White).unwrap();
    assert!(session.enumerate().unwrap().is_empty());
}
