//! Draw detection: repetition, the fifty-move rule, insufficient material.

use crate::board::Board;

#[test]
fn threefold_repetition_is_a_draw() {
    let mut board = Board::new();
    board
        .make_move_sequence(&[
            "g1f3", "g8f6", "f3g1", "f6g8", // twofold
            "g1f3", "g8f6", "f3g1", "f6g8", // threefold
        ])
        .unwrap();
    assert!(board.is_draw(0));
}

#[test]
fn twofold_inside_the_search_tree_is_a_draw() {
    let mut board = Board::new();
    board
        .make_move_sequence(&["g1f3", "g8f6", "f3g1", "f6g8"])
        .unwrap();
    // Seen from outside the search, one repetition is not yet a draw...
    assert!(!board.is_draw(0));
    // ...but four plies into a search it is.
    assert!(board.is_draw(4));
}

#[test]
fn fifty_move_rule() {
    let board: Board = "8/8/4k3/8/8/4K3/8/R7 w - - 100 80".parse().unwrap();
    assert!(board.is_draw(0));
    let board: Board = "8/8/4k3/8/8/4K3/8/R7 w - - 99 80".parse().unwrap();
    assert!(!board.is_draw(0));
}

#[test]
fn bare_kings_are_a_draw() {
    let board: Board = "8/8/4k3/8/8/4K3/8/8 w - - 0 1".parse().unwrap();
    assert!(board.is_insufficient_material());
    assert!(board.is_draw(0));
}

#[test]
fn lone_minor_is_a_draw() {
    let board: Board = "8/8/4k3/8/8/4K3/8/6B1 w - - 0 1".parse().unwrap();
    assert!(board.is_insufficient_material());
    let board: Board = "8/8/4k3/8/8/4K3/8/6N1 w - - 0 1".parse().unwrap();
    assert!(board.is_insufficient_material());
}

#[test]
fn same_colored_bishops_are_a_draw() {
    // Both bishops on light squares.
    let board: Board = "8/8/4k3/8/8/4K3/8/1B3B2 w - - 0 1".parse().unwrap();
    assert!(board.is_insufficient_material());
    // Opposite-colored bishops can in principle mate.
    let board: Board = "8/8/4k3/8/8/4K3/8/1B2B3 w - - 0 1".parse().unwrap();
    assert!(!board.is_insufficient_material());
}

#[test]
fn pawns_prevent_material_draws() {
    let board: Board = "8/8/4k3/8/8/4K3/4P3/8 w - - 0 1".parse().unwrap();
    assert!(!board.is_insufficient_material());
}

#[test]
fn unmake_restores_repetition_state() {
    let mut board = Board::new();
    board
        .make_move_sequence(&["g1f3", "g8f6", "f3g1", "f6g8"])
        .unwrap();
    let mv = board.parse_move("g1f3").unwrap();
    let info = board.make_move(mv);
    board.unmake_move(mv, info);
    assert!(!board.is_draw(0));
    assert!(board.is_draw(4));
}
