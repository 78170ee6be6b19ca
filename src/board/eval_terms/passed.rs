//! Passed-pawn evaluation: rank-indexed base bonus adjusted by king
//! proximity and the safety of the promotion path.

use crate::board::attack_tables::rook_attacks;
use crate::board::eval::Evaluation;
use crate::board::masks::forward_file_bb;
use crate::board::types::{s, Color, Piece, Score, Square, SCORE_ZERO};

use super::tables::{
    HINDER_PASSED_PAWN, PASSED_FILE, PASSED_RANK_EG, PASSED_RANK_MG, RANK_FACTOR,
};

impl Evaluation<'_> {
    fn king_distance(&self, color: Color, sq: Square) -> i32 {
        self.board.king_square(color).distance(sq).min(5) as i32
    }

    pub(crate) fn passed_pawns(&mut self, color: Color) -> Score {
        let board = self.board;
        let us = color.index();
        let them_color = color.opponent();
        let them = them_color.index();
        let mut score = SCORE_ZERO;

        for sq in self.pe.passed[us] {
            // Enemy presence or control anywhere on the promotion path.
            let hindered = forward_file_bb(color, sq)
                & (self.attacked_by_all[them] | board.color_pieces(them_color));
            score -= HINDER_PASSED_PAWN * hindered.popcount() as i32;

            let rank = sq.relative_rank(color);
            let rr = RANK_FACTOR[rank.min(6)];
            let mut mg = PASSED_RANK_MG[rank.min(6)];
            let mut eg = PASSED_RANK_EG[rank.min(6)];

            if rr != 0 {
                let block_sq = sq.forward(color).expect("passer not on last rank");

                eg += (self.king_distance(them_color, block_sq) * 5
                    - self.king_distance(color, block_sq) * 2)
                    * rr;

                // If the block square is not the queening square, look one
                // push further for the defending king race.
                if rank != 6 {
                    if let Some(next) = block_sq.forward(color) {
                        eg -= self.king_distance(color, next) * rr;
                    }
                }

                if board.piece_at(block_sq).is_none() {
                    let path = forward_file_bb(color, sq);
                    let behind = forward_file_bb(them_color, sq)
                        & (board.pieces_of_type(Piece::Rook)
                            | board.pieces_of_type(Piece::Queen))
                        & rook_attacks(sq, board.all_pieces());

                    // A rook or queen behind the pawn defends (or attacks)
                    // every square on the path at once.
                    let mut defended = path;
                    let mut unsafe_squares = path;
                    if (behind & board.color_pieces(color)).is_empty() {
                        defended &= self.attacked_by_all[us];
                    }
                    if (behind & board.color_pieces(them_color)).is_empty() {
                        unsafe_squares &=
                            self.attacked_by_all[them] | board.color_pieces(them_color);
                    }

                    let mut k = if unsafe_squares.is_empty() {
                        18
                    } else if !unsafe_squares.contains(block_sq) {
                        8
                    } else {
                        0
                    };
                    if defended == path {
                        k += 6;
                    } else if defended.contains(block_sq) {
                        k += 4;
                    }

                    mg += k * rr;
                    eg += k * rr;
                } else if board.color_pieces(color).contains(block_sq) {
                    mg += rr + rank as i32 * 2;
                    eg += rr + rank as i32 * 2;
                }
            }

            // Candidate passers needing one more push, and pawns with a
            // friend in front, count half.
            let not_yet_clear = sq
                .forward(color)
                .is_some_and(|front| !board.pawn_passed(color, front))
                || (board.pieces_of_type(Piece::Pawn) & forward_file_bb(color, sq)).any();
            if not_yet_clear {
                mg /= 2;
                eg /= 2;
            }

            score += s(mg, eg) + PASSED_FILE[sq.file()];
        }

        score
    }
}
