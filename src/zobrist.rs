//! Zobrist hashing tables.
//!
//! Three independent keys are maintained incrementally by the board: the full
//! position key, a pawns-only key for the pawn-structure cache, and a
//! material-configuration key for the material cache.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct ZobristTables {
    piece_square: [[[u64; 64]; 6]; 2],
    castling: [u64; 16],
    en_passant_file: [u64; 8],
    side_to_move: u64,
    // Per-(color, piece, count) keys for the material configuration.
    material_count: [[[u64; 11]; 6]; 2],
}

static TABLES: Lazy<ZobristTables> = Lazy::new(|| {
    // Fixed seed so hash keys (and therefore hash-keyed tests) are stable
    // across runs.
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe_f00d_1234);
    let mut t = ZobristTables {
        piece_square: [[[0; 64]; 6]; 2],
        castling: [0; 16],
        en_passant_file: [0; 8],
        side_to_move: 0,
        material_count: [[[0; 11]; 6]; 2],
    };
    for color in &mut t.piece_square {
        for piece in color.iter_mut() {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }
    }
    for key in &mut t.castling {
        *key = rng.gen();
    }
    for key in &mut t.en_passant_file {
        *key = rng.gen();
    }
    t.side_to_move = rng.gen();
    for color in &mut t.material_count {
        for piece in color.iter_mut() {
            for key in piece.iter_mut().skip(1) {
                *key = rng.gen();
            }
        }
    }
    t
});

#[inline]
#[must_use]
pub fn piece_square(color: usize, piece: usize, sq: usize) -> u64 {
    TABLES.piece_square[color][piece][sq]
}

#[inline]
#[must_use]
pub fn castling(rights: u8) -> u64 {
    TABLES.castling[rights as usize]
}

#[inline]
#[must_use]
pub fn en_passant_file(file: usize) -> u64 {
    TABLES.en_passant_file[file]
}

#[inline]
#[must_use]
pub fn side_to_move() -> u64 {
    TABLES.side_to_move
}

/// Key contribution of having exactly `count` pieces of the given kind.
/// The material key is the XOR of these over all (color, piece) pairs.
#[inline]
#[must_use]
pub fn material_count(color: usize, piece: usize, count: usize) -> u64 {
    TABLES.material_count[color][piece][count.min(10)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        assert_ne!(piece_square(0, 0, 0), piece_square(0, 0, 1));
        assert_ne!(piece_square(0, 0, 0), piece_square(1, 0, 0));
        assert_ne!(side_to_move(), 0);
    }

    #[test]
    fn zero_material_count_has_no_contribution() {
        assert_eq!(material_count(0, 2, 0), 0);
        assert_ne!(material_count(0, 2, 1), 0);
    }
}
