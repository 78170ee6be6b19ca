//! Geometric bitboard masks derived once at startup: lines, spans, flanks.

use once_cell::sync::Lazy;

use super::attack_tables::{bishop_rays, queen_attacks, rook_rays};
use super::types::bitboard::{
    CENTER_FILES, FILES, KING_SIDE, QUEEN_SIDE, RANK_1, RANK_2, RANK_3, RANK_6, RANK_7, RANK_8,
};
use super::types::{Bitboard, Color, Square};

struct LineTables {
    line: [[u64; 64]; 64],
    between: [[u64; 64]; 64],
}

static LINES: Lazy<Box<LineTables>> = Lazy::new(|| {
    let mut t = Box::new(LineTables {
        line: [[0; 64]; 64],
        between: [[0; 64]; 64],
    });
    for a in 0..64 {
        let sa = Square::from_index(a);
        for b in 0..64 {
            if a == b {
                continue;
            }
            let sb = Square::from_index(b);
            let (rays, full): (Bitboard, Bitboard) = if rook_rays(sa).contains(sb) {
                (rook_rays(sa), rook_rays(sb))
            } else if bishop_rays(sa).contains(sb) {
                (bishop_rays(sa), bishop_rays(sb))
            } else {
                continue;
            };
            t.line[a][b] = (rays & full).0 | (1u64 << a) | (1u64 << b);
            let blockers = Bitboard::from_square(sa) | Bitboard::from_square(sb);
            t.between[a][b] =
                (queen_attacks(sa, blockers) & queen_attacks(sb, blockers) & Bitboard(t.line[a][b]))
                    .0;
        }
    }
    t
});

struct SpanTables {
    forward_file: [[u64; 64]; 2],
    forward_ranks: [[u64; 64]; 2],
    pawn_attack_span: [[u64; 64]; 2],
    passed_pawn_span: [[u64; 64]; 2],
    adjacent_files: [u64; 8],
}

static SPANS: Lazy<Box<SpanTables>> = Lazy::new(|| {
    let mut t = Box::new(SpanTables {
        forward_file: [[0; 64]; 2],
        forward_ranks: [[0; 64]; 2],
        pawn_attack_span: [[0; 64]; 2],
        passed_pawn_span: [[0; 64]; 2],
        adjacent_files: [0; 8],
    });
    for file in 0..8 {
        let mut adj = 0u64;
        if file > 0 {
            adj |= FILES[file - 1].0;
        }
        if file < 7 {
            adj |= FILES[file + 1].0;
        }
        t.adjacent_files[file] = adj;
    }
    for idx in 0..64 {
        let sq = Square::from_index(idx);
        for color in [Color::White, Color::Black] {
            let c = color.index();
            let mut ranks = 0u64;
            for r in 0..8 {
                let ahead = match color {
                    Color::White => r > sq.rank(),
                    Color::Black => r < sq.rank(),
                };
                if ahead {
                    ranks |= super::types::bitboard::RANKS[r].0;
                }
            }
            t.forward_ranks[c][idx] = ranks;
            t.forward_file[c][idx] = ranks & FILES[sq.file()].0;
            t.pawn_attack_span[c][idx] = ranks & t.adjacent_files[sq.file()];
            t.passed_pawn_span[c][idx] = t.forward_file[c][idx] | t.pawn_attack_span[c][idx];
        }
    }
    t
});

/// Full line (both squares included) through two aligned squares, empty when
/// they are not aligned.
#[inline]
#[must_use]
pub fn line_bb(a: Square, b: Square) -> Bitboard {
    Bitboard(LINES.line[a.index()][b.index()])
}

/// Squares strictly between two aligned squares.
#[inline]
#[must_use]
pub fn between_bb(a: Square, b: Square) -> Bitboard {
    Bitboard(LINES.between[a.index()][b.index()])
}

/// True when three squares share a rank, file, or diagonal.
#[inline]
#[must_use]
pub fn aligned(a: Square, b: Square, c: Square) -> bool {
    line_bb(a, b).contains(c)
}

/// Squares ahead of `sq` on its file, from `color`'s point of view.
#[inline]
#[must_use]
pub fn forward_file_bb(color: Color, sq: Square) -> Bitboard {
    Bitboard(SPANS.forward_file[color.index()][sq.index()])
}

/// All squares on ranks ahead of `sq`.
#[inline]
#[must_use]
pub fn forward_ranks_bb(color: Color, sq: Square) -> Bitboard {
    Bitboard(SPANS.forward_ranks[color.index()][sq.index()])
}

/// Squares a pawn on `sq` could ever attack as it advances.
#[inline]
#[must_use]
pub fn pawn_attack_span(color: Color, sq: Square) -> Bitboard {
    Bitboard(SPANS.pawn_attack_span[color.index()][sq.index()])
}

/// Squares an enemy pawn would need to occupy to stop a pawn on `sq`.
#[inline]
#[must_use]
pub fn passed_pawn_span(color: Color, sq: Square) -> Bitboard {
    Bitboard(SPANS.passed_pawn_span[color.index()][sq.index()])
}

#[inline]
#[must_use]
pub fn adjacent_files_bb(file: usize) -> Bitboard {
    Bitboard(SPANS.adjacent_files[file])
}

/// The three-file flank a king on the given file fights on.
#[must_use]
pub fn king_flank(file: usize) -> Bitboard {
    match file {
        0..=2 => QUEEN_SIDE,
        3 | 4 => CENTER_FILES,
        _ => KING_SIDE,
    }
}

/// Our half of the board plus the third rank beyond it; the zone where enemy
/// flank attacks matter for king tropism.
#[must_use]
pub fn camp(color: Color) -> Bitboard {
    match color {
        Color::White => !(RANK_6 | RANK_7 | RANK_8),
        Color::Black => !(RANK_1 | RANK_2 | RANK_3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_is_exclusive() {
        let a1 = Square::A1;
        let h8 = Square::H8;
        let between = between_bb(a1, h8);
        assert_eq!(between.popcount(), 6);
        assert!(!between.contains(a1));
        assert!(!between.contains(h8));
        assert!(between.contains(Square::new(3, 3)));
    }

    #[test]
    fn unaligned_squares_have_no_line() {
        let a1 = Square::A1;
        let b3 = Square::new(2, 1);
        assert!(line_bb(a1, b3).is_empty());
        assert!(!aligned(a1, b3, Square::new(4, 2)));
    }

    #[test]
    fn passed_pawn_span_covers_three_files() {
        let e4: Square = "e4".parse().unwrap();
        let span = passed_pawn_span(Color::White, e4);
        assert!(span.contains("d5".parse().unwrap()));
        assert!(span.contains("e8".parse().unwrap()));
        assert!(span.contains("f7".parse().unwrap()));
        assert!(!span.contains("e3".parse().unwrap()));
        assert!(!span.contains("g5".parse().unwrap()));
    }

    #[test]
    fn king_flank_partitions_files() {
        assert_eq!(king_flank(0), QUEEN_SIDE);
        assert_eq!(king_flank(4), CENTER_FILES);
        assert_eq!(king_flank(7), KING_SIDE);
    }
}
