//! Static exchange evaluation.
//!
//! `see_ge` answers "does the exchange sequence started by this move keep at
//! least `threshold` centipawns?" without playing any move out. It walks the
//! swap sequence on the target square, always recapturing with the least
//! valuable attacker and revealing x-ray attackers as pieces come off.

use super::attack_tables::{bishop_attacks, rook_attacks};
use super::state::Board;
use super::types::{piece_value_mg, Bitboard, Move, MoveType, Piece, Square, Value};

impl Board {
    fn piece_value_on(&self, sq: Square) -> Value {
        self.squares[sq.index()].map_or(0, |(_, p)| piece_value_mg(p))
    }

    /// True when the static exchange after `mv` nets at least `threshold`.
    ///
    /// Non-normal moves (promotions, en passant, castling) are treated as a
    /// neutral exchange, as the original algorithm does.
    #[must_use]
    pub fn see_ge(&self, mv: Move, threshold: Value) -> bool {
        if mv.move_type() != MoveType::Normal {
            return 0 >= threshold;
        }
        let from = mv.from();
        let to = mv.to();
        let Some((moving_color, moving_piece)) = self.squares[from.index()] else {
            return 0 >= threshold;
        };

        // Gain of the capture itself, if any.
        let mut balance = self.piece_value_on(to) - threshold;
        if balance < 0 {
            return false;
        }

        // Worst case: our mover is immediately lost.
        let mut next_victim = moving_piece;
        balance -= piece_value_mg(next_victim);
        if balance >= 0 {
            return true;
        }

        let mut occupied =
            self.occupied ^ Bitboard::from_square(from) ^ Bitboard::from_square(to);
        let mut attackers = self.attackers_to(to, occupied) & occupied;
        let mut stm = moving_color.opponent();
        // True while it is the opponent of the original mover to recapture.
        let mut opponent_to_move = true;

        loop {
            let stm_attackers = attackers & self.by_color[stm.index()];
            if stm_attackers.is_empty() {
                return opponent_to_move;
            }
            next_victim = self.min_attacker(to, stm_attackers, &mut occupied, &mut attackers);
            if next_victim == Piece::King {
                // A king may only recapture when no opposing attacker remains.
                return opponent_to_move
                    == (attackers & self.by_color[stm.opponent().index()]).any();
            }
            balance += if opponent_to_move {
                piece_value_mg(next_victim)
            } else {
                -piece_value_mg(next_victim)
            };
            opponent_to_move = !opponent_to_move;
            if opponent_to_move == (balance >= 0) {
                return opponent_to_move;
            }
            stm = stm.opponent();
        }
    }

    /// Removes the least valuable attacker of `stm_attackers` from the board
    /// and reveals any x-ray attacker behind it.
    fn min_attacker(
        &self,
        to: Square,
        stm_attackers: Bitboard,
        occupied: &mut Bitboard,
        attackers: &mut Bitboard,
    ) -> Piece {
        for piece in [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ] {
            let subset = stm_attackers & self.pieces_of_type(piece);
            if subset.any() {
                if piece == Piece::King {
                    return Piece::King;
                }
                *occupied ^= Bitboard::from_square(subset.lsb());
                if matches!(piece, Piece::Pawn | Piece::Bishop | Piece::Queen) {
                    *attackers |= bishop_attacks(to, *occupied)
                        & (self.pieces_of_type(Piece::Bishop)
                            | self.pieces_of_type(Piece::Queen));
                }
                if matches!(piece, Piece::Rook | Piece::Queen) {
                    *attackers |= rook_attacks(to, *occupied)
                        & (self.pieces_of_type(Piece::Rook)
                            | self.pieces_of_type(Piece::Queen));
                }
                *attackers &= *occupied;
                return piece;
            }
        }
        Piece::King
    }

    /// Convenience for ordering: the sign of the exchange.
    #[inline]
    #[must_use]
    pub fn see_winning(&self, mv: Move) -> bool {
        self.see_ge(mv, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().expect("valid fen")
    }

    fn mv(b: &mut Board, text: &str) -> Move {
        b.parse_move(text).expect("legal move")
    }

    #[test]
    fn free_pawn_capture_is_winning() {
        let mut b = board("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        let m = mv(&mut b, "e4d5");
        assert!(b.see_ge(m, 0));
        assert!(b.see_ge(m, 100));
        assert!(!b.see_ge(m, 1000));
    }

    #[test]
    fn defended_pawn_breaks_even_for_a_pawn() {
        let mut b = board("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1");
        let m = mv(&mut b, "e4d5");
        assert!(b.see_ge(m, 0));
    }

    #[test]
    fn knight_takes_defended_pawn_loses_material() {
        let mut b = board("4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1");
        let m = mv(&mut b, "e4d5");
        assert!(!b.see_ge(m, 0));
    }

    #[test]
    fn xray_recapture_is_seen() {
        // Doubled white rooks win the defended pawn: Rxd5 Rxd5 Rxd5.
        let mut b = board("3r3k/8/8/3p4/8/8/3R4/3R3K w - - 0 1");
        let m = mv(&mut b, "d2d5");
        assert!(b.see_ge(m, 0));
        // Without the back rook the same capture loses the exchange.
        let mut b = board("3r3k/8/8/3p4/8/8/3R4/6K1 w - - 0 1");
        let m = mv(&mut b, "d2d5");
        assert!(!b.see_ge(m, 0));
    }

    #[test]
    fn quiet_move_to_attacked_square_fails_see() {
        // Rook steps onto a square covered by a pawn.
        let mut b = board("4k3/8/2p5/8/3R4/8/8/4K3 w - - 0 1");
        let m = mv(&mut b, "d4d5");
        assert!(!b.see_ge(m, 0));
    }
}
