//! Per-piece evaluation: mobility, outposts, bishop and rook patterns.

use crate::board::attack_tables::{
    bishop_attacks, bishop_rays, knight_attacks, queen_attacks, rook_attacks, rook_rays,
};
use crate::board::eval::Evaluation;
use crate::board::masks::line_bb;
use crate::board::types::bitboard::{CENTER, RANK_3, RANK_4, RANK_5, RANK_6};
use crate::board::types::{s, Bitboard, Color, Piece, Score, Square, SCORE_ZERO};

use super::tables::{
    BISHOP_PAWNS, KING_ATTACK_WEIGHTS, KING_PROTECTOR, LONG_RANGED_BISHOP, MINOR_BEHIND_PAWN,
    MOBILITY_BONUS, OUTPOST, ROOK_ON_FILE, ROOK_ON_PAWN, TRAPPED_BISHOP_CORNER, TRAPPED_ROOK,
    WEAK_QUEEN,
};

impl Evaluation<'_> {
    /// Evaluates all pieces of one type for one color, accumulating attack
    /// maps, king-ring pressure, and mobility along the way.
    pub(crate) fn pieces(&mut self, color: Color, piece: Piece) -> Score {
        let board = self.board;
        let us = color.index();
        let them_color = color.opponent();
        let them = them_color.index();
        let pt = piece.index() - 1; // 0 = knight .. 3 = queen
        let ksq = board.king_square(color);
        let outpost_ranks = match color {
            Color::White => RANK_4 | RANK_5 | RANK_6,
            Color::Black => RANK_5 | RANK_4 | RANK_3,
        };
        let pinned = board.pinned(color);

        let mut score = SCORE_ZERO;
        self.attacked_by[us][piece.index()] = Bitboard::EMPTY;

        for sq in board.pieces(color, piece) {
            // X-ray through our own queen (bishops) and queen/rooks (rooks).
            let mut b = match piece {
                Piece::Knight => knight_attacks(sq),
                Piece::Bishop => bishop_attacks(
                    sq,
                    board.all_pieces() ^ board.pieces_of_type(Piece::Queen),
                ),
                Piece::Rook => rook_attacks(
                    sq,
                    board.all_pieces()
                        ^ board.pieces_of_type(Piece::Queen)
                        ^ board.pieces(color, Piece::Rook),
                ),
                _ => queen_attacks(sq, board.all_pieces()),
            };

            if pinned.contains(sq) {
                b &= line_bb(ksq, sq);
            }

            self.attacked_by2[us] |= self.attacked_by_all[us] & b;
            self.attacked_by[us][piece.index()] |= b;
            self.attacked_by_all[us] |= b;
            if piece == Piece::Queen {
                self.queen_diagonal[us] |= b & bishop_rays(sq);
            }

            if (b & self.king_ring[them]).any() {
                self.king_attackers_count[us] += 1;
                self.king_attackers_weight[us] += KING_ATTACK_WEIGHTS[pt];
                self.king_adjacent_attacks[us] +=
                    (b & self.attacked_by[them][Piece::King.index()]).popcount() as i32;
            }

            let mob = (b & self.mobility_area[us]).popcount() as usize;
            self.mobility[us] += MOBILITY_BONUS[pt][mob.min(MOBILITY_BONUS[pt].len() - 1)];

            score += KING_PROTECTOR[pt] * sq.distance(ksq) as i32;

            if piece == Piece::Knight || piece == Piece::Bishop {
                let is_bishop = usize::from(piece == Piece::Bishop);
                let reachable = outpost_ranks & !self.pe.attack_span[them];
                if reachable.contains(sq) {
                    let supported =
                        self.attacked_by[us][Piece::Pawn.index()].contains(sq);
                    score += OUTPOST[is_bishop][usize::from(supported)] * 2;
                } else {
                    let landing = reachable & b & !board.color_pieces(color);
                    if landing.any() {
                        let supported =
                            (self.attacked_by[us][Piece::Pawn.index()] & landing).any();
                        score += OUTPOST[is_bishop][usize::from(supported)];
                    }
                }

                if sq.relative_rank(color) < 4 {
                    if let Some(front) = sq.forward(color) {
                        if board.pieces_of_type(Piece::Pawn).contains(front) {
                            score += MINOR_BEHIND_PAWN;
                        }
                    }
                }

                if piece == Piece::Bishop {
                    score -= BISHOP_PAWNS
                        * self.pe.pawns_on_same_color_squares(color, sq);

                    let diagonal_view = bishop_attacks(sq, board.pieces_of_type(Piece::Pawn))
                        | Bitboard::from_square(sq);
                    if (CENTER & diagonal_view).more_than_one() {
                        score += LONG_RANGED_BISHOP;
                    }

                    if board.is_chess960() {
                        score -= self.cornered_bishop_penalty(color, sq);
                    }
                }
            }

            if piece == Piece::Rook {
                if sq.relative_rank(color) >= 4 {
                    score += ROOK_ON_PAWN
                        * (board.pieces(them_color, Piece::Pawn) & rook_rays(sq)).popcount()
                            as i32;
                }

                if self.pe.semiopen_file(color, sq.file()) {
                    let open = usize::from(self.pe.semiopen_file(them_color, sq.file()));
                    score += ROOK_ON_FILE[open];
                } else if mob <= 3 {
                    let kf = ksq.file();
                    if (kf < 4) == (sq.file() < kf)
                        && !self.pe.semiopen_side(color, kf, sq.file() < kf)
                    {
                        let cannot_castle = i32::from(!self.can_castle(color));
                        score -= (TRAPPED_ROOK - s(mob as i32 * 22, 0)) * (1 + cannot_castle);
                    }
                }
            }

            if piece == Piece::Queen {
                let snipers = board.pieces(them_color, Piece::Rook)
                    | board.pieces(them_color, Piece::Bishop);
                if board.slider_blockers(snipers, sq).any() {
                    score -= WEAK_QUEEN;
                }
            }
        }
        score
    }

    fn can_castle(&self, color: Color) -> bool {
        let rights = self.board.castling_rights();
        match color {
            Color::White => rights & 0b0011 != 0,
            Color::Black => rights & 0b1100 != 0,
        }
    }

    /// A bishop in its own corner blocked by a friendly pawn diagonally in
    /// front of it; a recurring disaster in Chess960 starting positions.
    fn cornered_bishop_penalty(&self, color: Color, sq: Square) -> Score {
        let board = self.board;
        let corner_a = match color {
            Color::White => Square::A1,
            Color::Black => Square::A8,
        };
        let corner_h = match color {
            Color::White => Square::H1,
            Color::Black => Square::H8,
        };
        if sq != corner_a && sq != corner_h {
            return SCORE_ZERO;
        }
        let df: isize = if sq.file() == 0 { 1 } else { -1 };
        let dr: isize = match color {
            Color::White => 1,
            Color::Black => -1,
        };
        let Some(diag) = sq.offset(dr, df) else {
            return SCORE_ZERO;
        };
        if board.piece_at(diag) != Some((color, Piece::Pawn)) {
            return SCORE_ZERO;
        }
        let blocked_further = diag.offset(dr, 0).is_some_and(|front| {
            board.piece_at(front).is_some()
        });
        let doubled_pawn = diag
            .offset(dr, df)
            .is_some_and(|beyond| board.piece_at(beyond) == Some((color, Piece::Pawn)));
        if blocked_further {
            TRAPPED_BISHOP_CORNER * 4
        } else if doubled_pawn {
            TRAPPED_BISHOP_CORNER * 2
        } else {
            TRAPPED_BISHOP_CORNER
        }
    }
}
