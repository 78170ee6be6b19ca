//! UCI chess engine library.
//!
//! Provides the full engine stack:
//! - Bitboard position with incremental keys and piece-square scores
//! - Parallel alpha-beta search over a shared lock-free transposition table
//! - Hand-tuned classical evaluation with pawn and material caches
//! - Optional neural evaluation with a classical/NNUE blend policy
//! - UCI protocol front end
//!
//! # Quick start
//!
//! ```
//! use graphite::board::Board;
//!
//! let mut board = Board::new();
//! board.make_move_sequence(&["e2e4", "e7e5"]).unwrap();
//! assert_eq!(board.generate_moves().len(), 29);
//! ```
//!
//! # Features
//!
//! - `serde` - serialization for the public value types
//! - `logging` - debug logging via the `log` crate

// Bit patterns read better without separators, and index casts between
// squares, files, and array slots are pervasive and safe by construction.
#![warn(clippy::pedantic)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod board;
pub mod engine;
pub mod material;
pub mod pawn_hash;
pub mod tt;
pub mod uci;
pub mod zobrist;

impl board::Board {
    /// Applies a sequence of coordinate-notation moves; stops at the first
    /// illegal one.
    pub fn make_move_sequence(&mut self, moves: &[&str]) -> Result<(), board::MoveParseError> {
        for token in moves {
            let mv = self.parse_move(token)?;
            self.make_move(mv);
        }
        Ok(())
    }
}
