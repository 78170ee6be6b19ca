//! Precomputed attack tables.
//!
//! Leaper attacks are plain per-square arrays. Slider attacks use
//! blocker-indexed lookup: each square stores its relevant-occupancy mask and
//! a table holding the attack set for every subset of that mask.

use once_cell::sync::Lazy;

use super::types::{Bitboard, Color, Square};

const KNIGHT_DELTAS: [(isize, isize); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

const KING_DELTAS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const BISHOP_DIRS: [(isize, isize); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn leaper_table(deltas: &[(isize, isize)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    for (idx, slot) in table.iter_mut().enumerate() {
        let sq = Square::from_index(idx);
        let mut mask = 0u64;
        for &(dr, df) in deltas {
            if let Some(t) = sq.offset(dr, df) {
                mask |= 1u64 << t.index();
            }
        }
        *slot = mask;
    }
    table
}

static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KNIGHT_DELTAS));
static KING_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KING_DELTAS));

static PAWN_ATTACKS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    let mut table = [[0u64; 64]; 2];
    for idx in 0..64 {
        let sq = Square::from_index(idx);
        for (color, dr) in [(0usize, 1isize), (1, -1)] {
            let mut mask = 0u64;
            for df in [-1, 1] {
                if let Some(t) = sq.offset(dr, df) {
                    mask |= 1u64 << t.index();
                }
            }
            table[color][idx] = mask;
        }
    }
    table
});

/// Attack set of a slider at `sq` with the given blockers, walking each ray
/// until (and including) the first occupied square.
fn ray_attacks(sq: Square, occupancy: u64, dirs: &[(isize, isize)]) -> u64 {
    let mut attacks = 0u64;
    for &(dr, df) in dirs {
        let mut current = sq;
        while let Some(t) = current.offset(dr, df) {
            attacks |= 1u64 << t.index();
            if occupancy & (1u64 << t.index()) != 0 {
                break;
            }
            current = t;
        }
    }
    attacks
}

/// Relevant-occupancy mask: the rays without their final edge squares.
fn relevant_mask(sq: Square, dirs: &[(isize, isize)]) -> u64 {
    let mut mask = 0u64;
    for &(dr, df) in dirs {
        let mut current = sq;
        while let Some(t) = current.offset(dr, df) {
            if t.offset(dr, df).is_none() {
                break;
            }
            mask |= 1u64 << t.index();
            current = t;
        }
    }
    mask
}

/// Maps `occupancy & mask` onto a dense table index by collecting the mask's
/// bits in LSB order.
#[inline]
fn occupancy_index(occupancy: u64, mut mask: u64) -> usize {
    let mut index = 0usize;
    let mut bit = 0usize;
    while mask != 0 {
        let sq = mask.trailing_zeros();
        mask &= mask - 1;
        if occupancy & (1u64 << sq) != 0 {
            index |= 1 << bit;
        }
        bit += 1;
    }
    index
}

/// Expands a dense index back into an occupancy subset of `mask`.
fn occupancy_from_index(index: usize, mut mask: u64) -> u64 {
    let mut occ = 0u64;
    let mut bit = 0usize;
    while mask != 0 {
        let sq = mask.trailing_zeros();
        mask &= mask - 1;
        if index & (1 << bit) != 0 {
            occ |= 1u64 << sq;
        }
        bit += 1;
    }
    occ
}

struct SliderTable {
    masks: [u64; 64],
    attacks: Vec<Vec<u64>>,
}

impl SliderTable {
    fn build(dirs: &[(isize, isize)]) -> Self {
        let mut masks = [0u64; 64];
        let mut attacks = Vec::with_capacity(64);
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            let mask = relevant_mask(sq, dirs);
            masks[idx] = mask;
            let bits = mask.count_ones();
            let mut per_square = vec![0u64; 1 << bits];
            for (subset, slot) in per_square.iter_mut().enumerate() {
                let occ = occupancy_from_index(subset, mask);
                *slot = ray_attacks(sq, occ, dirs);
            }
            attacks.push(per_square);
        }
        SliderTable { masks, attacks }
    }

    #[inline]
    fn lookup(&self, sq: usize, occupancy: u64) -> u64 {
        let mask = self.masks[sq];
        self.attacks[sq][occupancy_index(occupancy & mask, mask)]
    }
}

static BISHOP_TABLE: Lazy<SliderTable> = Lazy::new(|| SliderTable::build(&BISHOP_DIRS));
static ROOK_TABLE: Lazy<SliderTable> = Lazy::new(|| SliderTable::build(&ROOK_DIRS));

#[inline]
#[must_use]
pub fn knight_attacks(sq: Square) -> Bitboard {
    Bitboard(KNIGHT_ATTACKS[sq.index()])
}

#[inline]
#[must_use]
pub fn king_attacks(sq: Square) -> Bitboard {
    Bitboard(KING_ATTACKS[sq.index()])
}

#[inline]
#[must_use]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    Bitboard(PAWN_ATTACKS[color.index()][sq.index()])
}

#[inline]
#[must_use]
pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    Bitboard(BISHOP_TABLE.lookup(sq.index(), occupancy.0))
}

#[inline]
#[must_use]
pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    Bitboard(ROOK_TABLE.lookup(sq.index(), occupancy.0))
}

#[inline]
#[must_use]
pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupancy) | rook_attacks(sq, occupancy)
}

/// Bishop rays on an empty board.
#[inline]
#[must_use]
pub fn bishop_rays(sq: Square) -> Bitboard {
    bishop_attacks(sq, Bitboard::EMPTY)
}

/// Rook rays on an empty board.
#[inline]
#[must_use]
pub fn rook_rays(sq: Square) -> Bitboard {
    rook_attacks(sq, Bitboard::EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_attack_counts() {
        assert_eq!(knight_attacks(Square::A1).popcount(), 2);
        assert_eq!(knight_attacks(Square::new(3, 3)).popcount(), 8);
    }

    #[test]
    fn rook_attacks_respect_blockers() {
        let sq = Square::A1;
        let blocker = Bitboard::from_square(Square::new(0, 3)); // d1
        let attacks = rook_attacks(sq, blocker);
        assert!(attacks.contains(Square::new(0, 3)));
        assert!(!attacks.contains(Square::new(0, 4)));
        assert!(attacks.contains(Square::new(7, 0)));
    }

    #[test]
    fn bishop_on_empty_board_sees_both_diagonals() {
        let attacks = bishop_rays(Square::new(3, 3)); // d4
        assert_eq!(attacks.popcount(), 13);
        assert!(attacks.contains(Square::A1));
        assert!(attacks.contains(Square::H8));
    }

    #[test]
    fn queen_is_rook_plus_bishop() {
        let sq = Square::new(4, 4);
        let occ = Bitboard::from_square(Square::new(4, 6));
        assert_eq!(
            queen_attacks(sq, occ),
            rook_attacks(sq, occ) | bishop_attacks(sq, occ)
        );
    }

    #[test]
    fn pawn_attacks_point_forward() {
        let e4: Square = "e4".parse().unwrap();
        let white = pawn_attacks(Color::White, e4);
        assert!(white.contains("d5".parse().unwrap()));
        assert!(white.contains("f5".parse().unwrap()));
        let black = pawn_attacks(Color::Black, e4);
        assert!(black.contains("d3".parse().unwrap()));
    }
}
