//! Making and unmaking moves.

use crate::zobrist;

use super::state::Board;
use super::types::{rights_mask, Color, Move, MoveType, Piece, Square};

/// State needed to reverse a move that the incremental piece updates cannot
/// restore by themselves.
#[derive(Clone, Copy, Debug)]
pub struct UnmakeInfo {
    captured: Option<Piece>,
    prev_ep: Option<Square>,
    prev_castling: u8,
    prev_halfmove: u32,
    prev_key: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct NullMoveInfo {
    prev_ep: Option<Square>,
    prev_halfmove: u32,
    prev_key: u64,
}

impl Board {
    /// Plays `mv`, which must be pseudo-legal for the side to move.
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        let us = self.side;
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();
        let piece = self.squares[from.index()].map(|(_, p)| p).unwrap_or(Piece::Pawn);

        let info = UnmakeInfo {
            captured: self.captured_piece(mv),
            prev_ep: self.ep_square,
            prev_castling: self.castling_rights,
            prev_halfmove: self.halfmove_clock,
            prev_key: self.key,
        };
        self.key_history.push(self.key);

        if let Some(ep) = self.ep_square.take() {
            self.key ^= zobrist::en_passant_file(ep.file());
        }

        match mv.move_type() {
            MoveType::Castling => {
                let (rook_from, rook_to) = rook_castling_squares(us, to);
                self.shift_piece(us, Piece::King, from, to);
                self.shift_piece(us, Piece::Rook, rook_from, rook_to);
            }
            MoveType::EnPassant => {
                let cap_sq = to.forward(them).expect("en passant target on the board");
                self.remove_piece(them, Piece::Pawn, cap_sq);
                self.shift_piece(us, Piece::Pawn, from, to);
            }
            MoveType::Promotion => {
                if let Some(captured) = info.captured {
                    self.remove_piece(them, captured, to);
                }
                self.remove_piece(us, Piece::Pawn, from);
                self.put_piece(us, mv.promotion_piece(), to);
            }
            MoveType::Normal => {
                if let Some(captured) = info.captured {
                    self.remove_piece(them, captured, to);
                }
                self.shift_piece(us, piece, from, to);
                if piece == Piece::Pawn && from.rank_distance(to) == 2 {
                    let ep = from.forward(us).expect("double push origin not on last rank");
                    self.ep_square = Some(ep);
                    self.key ^= zobrist::en_passant_file(ep.file());
                }
            }
        }

        let new_rights = self.castling_rights & rights_mask(from) & rights_mask(to);
        if new_rights != self.castling_rights {
            self.key ^=
                zobrist::castling(self.castling_rights) ^ zobrist::castling(new_rights);
            self.castling_rights = new_rights;
        }

        if piece == Piece::Pawn || info.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        self.game_ply += 1;
        self.side = them;
        self.key ^= zobrist::side_to_move();

        info
    }

    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        let us = self.side.opponent();
        let them = self.side;
        let from = mv.from();
        let to = mv.to();

        match mv.move_type() {
            MoveType::Castling => {
                let (rook_from, rook_to) = rook_castling_squares(us, to);
                self.shift_piece(us, Piece::Rook, rook_to, rook_from);
                self.shift_piece(us, Piece::King, to, from);
            }
            MoveType::EnPassant => {
                self.shift_piece(us, Piece::Pawn, to, from);
                let cap_sq = to.forward(them).expect("en passant target on the board");
                self.put_piece(them, Piece::Pawn, cap_sq);
            }
            MoveType::Promotion => {
                self.remove_piece(us, mv.promotion_piece(), to);
                self.put_piece(us, Piece::Pawn, from);
                if let Some(captured) = info.captured {
                    self.put_piece(them, captured, to);
                }
            }
            MoveType::Normal => {
                let piece = self.squares[to.index()].map(|(_, p)| p).unwrap_or(Piece::Pawn);
                self.shift_piece(us, piece, to, from);
                if let Some(captured) = info.captured {
                    self.put_piece(them, captured, to);
                }
            }
        }

        self.side = us;
        self.ep_square = info.prev_ep;
        self.castling_rights = info.prev_castling;
        self.halfmove_clock = info.prev_halfmove;
        self.key = info.prev_key;
        self.game_ply -= 1;
        self.key_history.pop();
    }

    /// Passes the move to the opponent; used by null-move pruning.
    pub fn make_null_move(&mut self) -> NullMoveInfo {
        debug_assert!(self.checkers().is_empty());
        let info = NullMoveInfo {
            prev_ep: self.ep_square,
            prev_halfmove: self.halfmove_clock,
            prev_key: self.key,
        };
        if let Some(ep) = self.ep_square.take() {
            self.key ^= zobrist::en_passant_file(ep.file());
        }
        self.halfmove_clock += 1;
        self.side = self.side.opponent();
        self.key ^= zobrist::side_to_move();
        info
    }

    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.side = self.side.opponent();
        self.ep_square = info.prev_ep;
        self.halfmove_clock = info.prev_halfmove;
        self.key = info.prev_key;
    }
}

/// Rook source and destination for a castling move given the king's target.
fn rook_castling_squares(color: Color, king_to: Square) -> (Square, Square) {
    match (color, king_to.file()) {
        (Color::White, 6) => (Square::H1, Square::F1),
        (Color::White, _) => (Square::A1, Square::D1),
        (Color::Black, 6) => (Square::H8, Square::F8),
        (Color::Black, _) => (Square::A8, Square::D8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_unmake_restores_all_state() {
        let mut board = Board::new();
        let key = board.key();
        let pawn_key = board.pawn_key();
        let material_key = board.material_key();
        let psq = board.psq_score();

        let moves = board.generate_moves();
        for &mv in &moves {
            let info = board.make_move(mv);
            board.unmake_move(mv, info);
            assert_eq!(board.key(), key, "key mismatch after {mv}");
            assert_eq!(board.pawn_key(), pawn_key, "pawn key mismatch after {mv}");
            assert_eq!(
                board.material_key(),
                material_key,
                "material key mismatch after {mv}"
            );
            assert_eq!(board.psq_score(), psq, "psq mismatch after {mv}");
        }
    }

    #[test]
    fn null_move_flips_side_and_key() {
        let mut board = Board::new();
        let key = board.key();
        let info = board.make_null_move();
        assert_ne!(board.key(), key);
        assert_eq!(board.side_to_move(), Color::Black);
        board.unmake_null_move(info);
        assert_eq!(board.key(), key);
        assert_eq!(board.side_to_move(), Color::White);
    }

    #[test]
    fn en_passant_capture_round_trips() {
        let mut board: Board = "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
            .parse()
            .unwrap();
        let key = board.key();
        let mv = Move::en_passant("d4".parse().unwrap(), "e3".parse().unwrap());
        let info = board.make_move(mv);
        assert_eq!(board.count(Color::White, Piece::Pawn), 7);
        board.unmake_move(mv, info);
        assert_eq!(board.key(), key);
        assert_eq!(board.count(Color::White, Piece::Pawn), 8);
    }

    #[test]
    fn castling_moves_rook_too() {
        let mut board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mv = Move::castling(Square::E1, Square::G1);
        let info = board.make_move(mv);
        assert_eq!(board.piece_at(Square::G1), Some((Color::White, Piece::King)));
        assert_eq!(board.piece_at(Square::F1), Some((Color::White, Piece::Rook)));
        assert_eq!(board.piece_at(Square::H1), None);
        board.unmake_move(mv, info);
        assert_eq!(board.piece_at(Square::E1), Some((Color::White, Piece::King)));
        assert_eq!(board.piece_at(Square::H1), Some((Color::White, Piece::Rook)));
    }
}
