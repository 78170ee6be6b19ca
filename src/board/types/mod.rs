//! Core value types shared across the board, evaluation, and search layers.

pub mod bitboard;
mod castling;
mod moves;
mod piece;
mod score;
mod square;

pub use bitboard::Bitboard;
pub use castling::{
    rights_mask, rights_to_fen, ALL_RIGHTS, BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE,
    WHITE_QUEENSIDE,
};
pub use moves::{Move, MoveList, MoveType, MAX_MOVES};
pub use piece::{colored_piece_index, Color, Piece, ALL_PIECES, NO_PIECE_INDEX};
pub use score::{
    mate_in, mated_in, piece_value_eg, piece_value_mg, s, Score, Value, BISHOP_EG, BISHOP_MG,
    KNIGHT_EG, KNIGHT_MG, MAX_PLY, PAWN_EG, PAWN_MG, PHASE_MIDGAME, QUEEN_EG, QUEEN_MG, ROOK_EG,
    ROOK_MG, SCALE_FACTOR_DRAW, SCALE_FACTOR_NORMAL, SCORE_ZERO, TEMPO, VALUE_DRAW,
    VALUE_INFINITE, VALUE_KNOWN_WIN, VALUE_MATE, VALUE_MATED_IN_MAX_PLY, VALUE_MATE_IN_MAX_PLY,
    VALUE_NONE,
};
pub use square::{Square, SquareParseError};
