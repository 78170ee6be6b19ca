//! Threat bonuses: attacked, hanging, and soon-to-be-attacked enemy pieces.

use crate::board::eval::Evaluation;
use crate::board::types::bitboard::{RANK_3, RANK_6};
use crate::board::types::{Bitboard, Color, Piece, Score, SCORE_ZERO};

use super::tables::{
    HANGING, THREAT_BY_ATTACK_ON_QUEEN, THREAT_BY_KING, THREAT_BY_MINOR, THREAT_BY_PAWN_PUSH,
    THREAT_BY_RANK, THREAT_BY_ROOK, THREAT_BY_SAFE_PAWN, WEAK_UNOPPOSED_PAWN,
};

impl Evaluation<'_> {
    pub(crate) fn threats(&mut self, color: Color) -> Score {
        let board = self.board;
        let us = color.index();
        let them_color = color.opponent();
        let them = them_color.index();
        let mut score = SCORE_ZERO;

        let enemy_nonpawns =
            board.color_pieces(them_color) ^ board.pieces(them_color, Piece::Pawn);

        // Enemy non-pawns attacked by one of our pawns that is itself safe.
        let pawn_attacked = enemy_nonpawns & self.attacked_by[us][Piece::Pawn.index()];
        if pawn_attacked.any() {
            let safe_pawns = board.pieces(color, Piece::Pawn)
                & (!self.attacked_by_all[them] | self.attacked_by_all[us]);
            let safe_threats = safe_pawns.pawn_attacks(color) & pawn_attacked;
            score += THREAT_BY_SAFE_PAWN * safe_threats.popcount() as i32;
        }

        // Squares the opponent holds firmly: pawn-defended, or doubly
        // defended and not doubly attacked by us.
        let strongly_protected = self.attacked_by[them][Piece::Pawn.index()]
            | (self.attacked_by2[them] & !self.attacked_by2[us]);

        let defended = enemy_nonpawns & strongly_protected;
        let weak =
            board.color_pieces(them_color) & !strongly_protected & self.attacked_by_all[us];

        if (defended | weak).any() {
            let minors_attack = (defended | weak)
                & (self.attacked_by[us][Piece::Knight.index()]
                    | self.attacked_by[us][Piece::Bishop.index()]);
            for sq in minors_attack {
                if let Some((_, piece)) = board.piece_at(sq) {
                    score += THREAT_BY_MINOR[piece.index()];
                    if piece != Piece::Pawn {
                        score += THREAT_BY_RANK * sq.relative_rank(them_color) as i32;
                    }
                }
            }

            let rooks_attack = (board.pieces(them_color, Piece::Queen) | weak)
                & self.attacked_by[us][Piece::Rook.index()];
            for sq in rooks_attack {
                if let Some((_, piece)) = board.piece_at(sq) {
                    score += THREAT_BY_ROOK[piece.index()];
                    if piece != Piece::Pawn {
                        score += THREAT_BY_RANK * sq.relative_rank(them_color) as i32;
                    }
                }
            }

            score += HANGING * (weak & !self.attacked_by_all[them]).popcount() as i32;

            let king_hits = weak & self.attacked_by[us][Piece::King.index()];
            if king_hits.any() {
                score += THREAT_BY_KING[usize::from(king_hits.more_than_one())];
            }
        }

        // Enemy weak pawns matter once we have heavy pieces to collect them.
        if (board.pieces(color, Piece::Rook) | board.pieces(color, Piece::Queen)).any() {
            score += WEAK_UNOPPOSED_PAWN * self.pe.weak_unopposed(them_color);
        }

        // Pawn pushes that would fork or attack a piece next move.
        let third_rank = match color {
            Color::White => RANK_3,
            Color::Black => RANK_6,
        };
        let mut pushes =
            board.pieces(color, Piece::Pawn).forward(color) & !board.all_pieces();
        pushes |= (pushes & third_rank).forward(color) & !board.all_pieces();
        pushes &= !self.attacked_by[them][Piece::Pawn.index()]
            & (self.attacked_by_all[us] | !self.attacked_by_all[them]);
        let push_threats = pushes.pawn_attacks(color)
            & board.color_pieces(them_color)
            & !self.attacked_by[us][Piece::Pawn.index()];
        score += THREAT_BY_PAWN_PUSH * push_threats.popcount() as i32;

        // Safe slider attacks on the enemy queen along lines she does not
        // defend herself.
        let safe_spots: Bitboard =
            !board.color_pieces(color) & !self.attacked_by2[them] & self.attacked_by2[us];
        let queen_lines = (self.attacked_by[us][Piece::Bishop.index()]
            & self.queen_diagonal[them])
            | (self.attacked_by[us][Piece::Rook.index()]
                & self.attacked_by[them][Piece::Queen.index()]
                & !self.queen_diagonal[them]);
        score += THREAT_BY_ATTACK_ON_QUEEN * (queen_lines & safe_spots).popcount() as i32;

        score
    }
}
