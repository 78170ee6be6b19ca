//! Classical static evaluation.
//!
//! The evaluation composes independent terms, each producing a (middlegame,
//! endgame) `Score` from white's point of view, then blends the pair by game
//! phase and endgame scale factor. Expensive terms are skipped entirely when
//! material plus pawn structure already decide the position (the lazy exit).

use crate::material::{MaterialEntry, MaterialTable};
use crate::pawn_hash::{PawnEntry, PawnHashTable};

use super::attack_tables::king_attacks;
use super::eval_terms::tables::{LAZY_THRESHOLD, SPACE_THRESHOLD};
use super::state::Board;
use super::types::bitboard::{CENTER_FILES, KING_SIDE, QUEEN_SIDE, RANK_2, RANK_3, RANK_6, RANK_7};
use super::types::{
    s, Bitboard, Color, Piece, Score, Value, BISHOP_EG, BISHOP_MG, KNIGHT_MG, PHASE_MIDGAME,
    ROOK_MG, SCALE_FACTOR_NORMAL, SCORE_ZERO, TEMPO,
};

/// Per-thread evaluation context: the pawn and material caches.
pub struct EvalContext {
    pub pawn_table: PawnHashTable,
    pub material_table: MaterialTable,
}

impl EvalContext {
    #[must_use]
    pub fn new() -> Self {
        EvalContext {
            pawn_table: PawnHashTable::new(),
            material_table: MaterialTable::new(),
        }
    }

    /// Static evaluation from the side to move's point of view.
    #[must_use]
    pub fn evaluate(&mut self, board: &Board) -> Value {
        debug_assert!(board.checkers().is_empty());
        let me = self.material_table.probe(board).clone();
        let pe = self.pawn_table.probe(board).clone();
        let v = Evaluation::new(board, &pe, &me).value();
        let v = if board.side_to_move() == Color::White {
            v
        } else {
            -v
        };
        v + TEMPO
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        EvalContext::new()
    }
}

pub(crate) struct Evaluation<'a> {
    pub(crate) board: &'a Board,
    pub(crate) pe: &'a PawnEntry,
    pub(crate) me: &'a MaterialEntry,
    pub(crate) mobility_area: [Bitboard; 2],
    pub(crate) mobility: [Score; 2],
    /// Squares attacked by each piece type of each color.
    pub(crate) attacked_by: [[Bitboard; 6]; 2],
    pub(crate) attacked_by_all: [Bitboard; 2],
    /// Squares attacked by two or more pieces of a color.
    pub(crate) attacked_by2: [Bitboard; 2],
    /// Diagonal component of the queens' attacks.
    pub(crate) queen_diagonal: [Bitboard; 2],
    pub(crate) king_ring: [Bitboard; 2],
    pub(crate) king_attackers_count: [i32; 2],
    pub(crate) king_attackers_weight: [i32; 2],
    pub(crate) king_adjacent_attacks: [i32; 2],
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(board: &'a Board, pe: &'a PawnEntry, me: &'a MaterialEntry) -> Self {
        Evaluation {
            board,
            pe,
            me,
            mobility_area: [Bitboard::EMPTY; 2],
            mobility: [SCORE_ZERO; 2],
            attacked_by: [[Bitboard::EMPTY; 6]; 2],
            attacked_by_all: [Bitboard::EMPTY; 2],
            attacked_by2: [Bitboard::EMPTY; 2],
            queen_diagonal: [Bitboard::EMPTY; 2],
            king_ring: [Bitboard::EMPTY; 2],
            king_attackers_count: [0; 2],
            king_attackers_weight: [0; 2],
            king_adjacent_attacks: [0; 2],
        }
    }

    /// Full evaluation from white's point of view.
    pub(crate) fn value(&mut self) -> Value {
        let board = self.board;
        let mut score = board.psq_score()
            + self.me.imbalance()
            + self.pe.score(Color::White)
            - self.pe.score(Color::Black);

        let lazy = (score.mg + score.eg) / 2;
        if lazy.abs() > LAZY_THRESHOLD {
            return lazy;
        }

        self.initialize(Color::White);
        self.initialize(Color::Black);

        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            score += self.pieces(Color::White, piece) - self.pieces(Color::Black, piece);
        }
        score += self.mobility[0] - self.mobility[1];
        score += self.king(Color::White) - self.king(Color::Black);
        score += self.threats(Color::White) - self.threats(Color::Black);
        score += self.passed_pawns(Color::White) - self.passed_pawns(Color::Black);

        if board.total_non_pawn_material() >= SPACE_THRESHOLD {
            score += self.space(Color::White) - self.space(Color::Black);
        }

        score += self.initiative(score.eg);

        let sf = self.scale_factor(score.eg);
        let phase = self.me.game_phase();
        (score.mg * phase + score.eg * (PHASE_MIDGAME - phase) * sf / SCALE_FACTOR_NORMAL)
            / PHASE_MIDGAME
    }

    /// Computes king/pawn attack bitboards, the mobility area, and seeds the
    /// king-safety accumulators.
    fn initialize(&mut self, color: Color) {
        let board = self.board;
        let us = color.index();
        let them = color.opponent().index();
        let low_ranks = match color {
            Color::White => RANK_2 | RANK_3,
            Color::Black => RANK_7 | RANK_6,
        };

        let shifted_down = match color {
            Color::White => board.all_pieces().south(),
            Color::Black => board.all_pieces().north(),
        };
        let blocked_or_low = board.pieces(color, Piece::Pawn) & (shifted_down | low_ranks);

        let ksq = board.king_square(color);
        self.mobility_area[us] = !(blocked_or_low
            | Bitboard::from_square(ksq)
            | self.pe.attacks[them]);

        let king = king_attacks(ksq);
        self.attacked_by[us][Piece::King.index()] = king;
        self.attacked_by[us][Piece::Pawn.index()] = self.pe.attacks[us];
        self.attacked_by2[us] = king & self.pe.attacks[us];
        self.attacked_by_all[us] = king | self.pe.attacks[us];

        if board.non_pawn_material(color.opponent()) >= ROOK_MG + KNIGHT_MG {
            self.king_ring[us] = king;
            if ksq.relative_rank(color) == 0 {
                self.king_ring[us] |= king.forward(color);
            }
            self.king_attackers_count[them] = (king & self.pe.attacks[them]).popcount() as i32;
            self.king_attackers_weight[them] = 0;
            self.king_adjacent_attacks[them] = 0;
        } else {
            self.king_ring[us] = Bitboard::EMPTY;
            self.king_attackers_count[them] = 0;
        }
    }

    /// Space bonus: safe squares in the central zone on our half, counted
    /// twice when behind a friendly pawn, weighted quadratically by piece
    /// count minus open files.
    fn space(&self, color: Color) -> Score {
        let board = self.board;
        let us = color.index();
        let them = color.opponent().index();
        let space_mask = match color {
            Color::White => CENTER_FILES & (RANK_2 | RANK_3 | super::types::bitboard::RANK_4),
            Color::Black => CENTER_FILES & (RANK_7 | RANK_6 | super::types::bitboard::RANK_5),
        };

        let safe = space_mask
            & !board.pieces(color, Piece::Pawn)
            & !self.attacked_by[them][Piece::Pawn.index()]
            & (self.attacked_by_all[us] | !self.attacked_by_all[them]);

        let mut behind = board.pieces(color, Piece::Pawn);
        behind |= match color {
            Color::White => behind.south(),
            Color::Black => behind.north(),
        };
        behind |= match color {
            Color::White => Bitboard(behind.0 >> 16),
            Color::Black => Bitboard(behind.0 << 16),
        };

        let bonus = (safe.popcount() + (behind & safe).popcount()) as i32;
        let weight = board.color_pieces(color).popcount() as i32 - 2 * self.pe.open_files();
        s(bonus * weight * weight / 16, 0)
    }

    /// Second-order endgame corrector; its sign follows the endgame score and
    /// it can never flip that sign.
    fn initiative(&self, eg: Value) -> Score {
        let board = self.board;
        let wk = board.king_square(Color::White);
        let bk = board.king_square(Color::Black);
        let king_distance = wk.file_distance(bk) as i32 - wk.rank_distance(bk) as i32;
        let pawns = board.pieces_of_type(Piece::Pawn);
        let both_flanks = (pawns & QUEEN_SIDE).any() && (pawns & KING_SIDE).any();

        let initiative = 8 * (self.pe.pawn_asymmetry() + king_distance - 17)
            + 12 * pawns.popcount() as i32
            + 16 * i32::from(both_flanks);

        let v = eg.signum() * initiative.max(-eg.abs());
        s(0, v)
    }

    /// Scale factor for the winning side's endgame score.
    fn scale_factor(&self, eg: Value) -> i32 {
        let board = self.board;
        let strong = if eg > 0 { Color::White } else { Color::Black };
        let sf = self.me.scale_factor(strong);
        if sf != SCALE_FACTOR_NORMAL {
            return sf;
        }

        if board.opposite_bishops() {
            // Pure opposite-bishop endings are nearly dead drawn; with more
            // pieces on the board some winning chances remain.
            if board.non_pawn_material(Color::White) == BISHOP_MG
                && board.non_pawn_material(Color::Black) == BISHOP_MG
            {
                return if board.pieces_of_type(Piece::Pawn).more_than_one() {
                    31
                } else {
                    9
                };
            }
            return 46;
        }

        let weak = strong.opponent();
        if eg.abs() <= BISHOP_EG
            && board.count(strong, Piece::Pawn) <= 2
            && !board.pawn_passed(weak, board.king_square(weak))
        {
            return 37 + 7 * board.count(strong, Piece::Pawn) as i32;
        }

        SCALE_FACTOR_NORMAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(fen: &str) -> Value {
        let board: Board = fen.parse().unwrap();
        EvalContext::new().evaluate(&board)
    }

    #[test]
    fn start_position_is_near_balanced() {
        let v = eval("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(v.abs() < 60, "start eval {v}");
    }

    #[test]
    fn queen_up_is_winning() {
        let v = eval("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(v > 800, "queen-up eval {v}");
    }

    #[test]
    fn evaluation_is_antisymmetric() {
        // The same position with colors swapped and side to move flipped
        // must evaluate identically (tempo cancels).
        let a = eval("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
        let b = eval("rnbqkb1r/pppp1ppp/5n2/4p3/4P3/2N5/PPPP1PPP/R1BQKBNR b KQkq - 2 3");
        assert_eq!(a, b);
    }

    #[test]
    fn opposite_bishop_ending_is_drawish() {
        let v = eval("8/8/4k3/4p3/4P3/3K1B2/8/5b2 w - - 0 1");
        assert!(v.abs() < 150, "opposite-bishop eval {v}");
    }

    #[test]
    fn passed_pawn_is_an_asset() {
        let with_passer = eval("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        let without = eval("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert!(with_passer > without + 100);
    }
}
