//! Perft: the reference leaf counts every move generator must reproduce.

use crate::board::Board;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

#[test]
fn startpos_shallow() {
    let mut board = Board::new();
    assert_eq!(board.perft(1), 20);
    assert_eq!(board.perft(2), 400);
    assert_eq!(board.perft(3), 8_902);
    assert_eq!(board.perft(4), 197_281);
}

#[test]
#[ignore = "slow; run with --ignored"]
fn startpos_deep() {
    let mut board = Board::new();
    assert_eq!(board.perft(5), 4_865_609);
    assert_eq!(board.perft(6), 119_060_324);
}

#[test]
fn kiwipete_shallow() {
    let mut board: Board = KIWIPETE.parse().unwrap();
    assert_eq!(board.perft(1), 48);
    assert_eq!(board.perft(2), 2_039);
    assert_eq!(board.perft(3), 97_862);
}

#[test]
#[ignore = "slow; run with --ignored"]
fn kiwipete_deep() {
    let mut board: Board = KIWIPETE.parse().unwrap();
    assert_eq!(board.perft(4), 4_085_603);
    assert_eq!(board.perft(5), 193_690_690);
}

#[test]
fn en_passant_position() {
    // Position 3 from the classic perft suite.
    let mut board: Board = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1".parse().unwrap();
    assert_eq!(board.perft(1), 14);
    assert_eq!(board.perft(2), 191);
    assert_eq!(board.perft(3), 2_812);
    assert_eq!(board.perft(4), 43_238);
}

#[test]
fn promotion_position() {
    // Position 4: promotions, castling through attacks, pins.
    let mut board: Board = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1"
        .parse()
        .unwrap();
    assert_eq!(board.perft(1), 6);
    assert_eq!(board.perft(2), 264);
    assert_eq!(board.perft(3), 9_467);
}

#[test]
fn talkchess_position() {
    // Position 5 catches castling-rights and promotion interaction bugs.
    let mut board: Board = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"
        .parse()
        .unwrap();
    assert_eq!(board.perft(1), 44);
    assert_eq!(board.perft(2), 1_486);
    assert_eq!(board.perft(3), 62_379);
}
