mod fen;
mod make_unmake;
mod see;
mod state;

pub mod attack_tables;
pub mod eval;
pub(crate) mod eval_terms;
pub mod masks;
pub mod movegen;
pub mod nnue;
pub mod search;
pub mod types;

#[cfg(test)]
mod tests;

pub use fen::FenError;
pub use make_unmake::{NullMoveInfo, UnmakeInfo};
pub use movegen::{GenKind, MoveParseError};
pub use state::Board;
