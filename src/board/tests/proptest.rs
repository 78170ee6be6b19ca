//! Property-based tests over randomly played games.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::eval::EvalContext;
use crate::board::movegen::GenKind;
use crate::board::types::{Color, Piece, Square};
use crate::board::Board;

/// Plays up to `plies` random legal moves from the start position.
fn random_game(seed: u64, plies: usize) -> Board {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = Board::new();
    for _ in 0..plies {
        let moves = board.generate_moves();
        if moves.is_empty() || board.is_draw(0) {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);
    }
    board
}

/// The same position with colors swapped and the board rank-flipped.
fn color_flipped(board: &Board) -> Board {
    let fen = board.to_fen();
    let mut fields = fen.split_whitespace();
    let placement = fields.next().unwrap();
    let side = fields.next().unwrap();
    let castling = fields.next().unwrap();
    let ep = fields.next().unwrap();
    let halfmove = fields.next().unwrap();

    let flipped_placement = placement
        .split('/')
        .rev()
        .map(|rank| {
            rank.chars()
                .map(|c| {
                    if c.is_ascii_alphabetic() {
                        if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else {
                            c.to_ascii_uppercase()
                        }
                    } else {
                        c
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("/");
    let flipped_side = if side == "w" { "b" } else { "w" };
    let flipped_castling: String = if castling == "-" {
        "-".to_string()
    } else {
        let mut s: Vec<char> = castling
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        s.sort_by_key(|c| match c {
            'K' => 0,
            'Q' => 1,
            'k' => 2,
            'q' => 3,
            _ => 4,
        });
        s.into_iter().collect()
    };
    let flipped_ep = if ep == "-" {
        "-".to_string()
    } else {
        let sq: Square = ep.parse().unwrap();
        sq.flip_rank().to_string()
    };

    format!("{flipped_placement} {flipped_side} {flipped_castling} {flipped_ep} {halfmove} 1")
        .parse()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn make_unmake_restores_every_incremental(seed in 0u64..1000, plies in 0usize..60) {
        let mut board = random_game(seed, plies);
        let key = board.key();
        let pawn_key = board.pawn_key();
        let material_key = board.material_key();
        let psq = board.psq_score();
        let npm_white = board.non_pawn_material(Color::White);

        let moves = board.generate_moves();
        for &mv in &moves {
            let info = board.make_move(mv);
            board.unmake_move(mv, info);
        }

        prop_assert_eq!(board.key(), key);
        prop_assert_eq!(board.pawn_key(), pawn_key);
        prop_assert_eq!(board.material_key(), material_key);
        prop_assert_eq!(board.psq_score(), psq);
        prop_assert_eq!(board.non_pawn_material(Color::White), npm_white);
    }

    #[test]
    fn legal_moves_are_a_subset_of_pseudo_legal(seed in 0u64..1000, plies in 0usize..60) {
        let mut board = random_game(seed, plies);
        let pseudo = board.generate_pseudo(GenKind::All);
        let legal = board.generate_moves();
        for mv in &legal {
            prop_assert!(pseudo.contains(*mv));
        }
    }

    #[test]
    fn evaluation_is_color_antisymmetric(seed in 0u64..1000, plies in 0usize..60) {
        let board = random_game(seed, plies);
        if board.checkers().any() {
            return Ok(());
        }
        let flipped = color_flipped(&board);
        let mut ctx = EvalContext::new();
        // Side-relative scores of mirrored positions agree exactly; the
        // tempo terms cancel out.
        prop_assert_eq!(ctx.evaluate(&board), ctx.evaluate(&flipped));
    }

    #[test]
    fn see_threshold_is_monotone(seed in 0u64..1000, plies in 0usize..60) {
        let mut board = random_game(seed, plies);
        let captures = board.generate_pseudo(GenKind::Captures);
        for &mv in captures.iter().take(8) {
            if board.see_ge(mv, 100) {
                prop_assert!(board.see_ge(mv, 0));
            }
            if !board.see_ge(mv, 0) {
                prop_assert!(!board.see_ge(mv, 100));
            }
        }
    }

    #[test]
    fn fen_round_trips_through_random_positions(seed in 0u64..1000, plies in 0usize..60) {
        let board = random_game(seed, plies);
        let reparsed: Board = board.to_fen().parse().unwrap();
        prop_assert_eq!(reparsed.key(), board.key());
        prop_assert_eq!(reparsed.to_fen(), board.to_fen());
    }
}

#[test]
fn flipped_start_position_is_the_start_position() {
    let board = Board::new();
    let flipped = color_flipped(&board);
    assert_eq!(flipped.pieces(Color::Black, Piece::Queen).popcount(), 1);
    let mut ctx = EvalContext::new();
    assert_eq!(ctx.evaluate(&board), ctx.evaluate(&flipped));
}
