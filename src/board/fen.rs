//! FEN parsing and formatting.

use std::fmt;
use std::str::FromStr;

use crate::zobrist;

use super::state::Board;
use super::types::{
    rights_to_fen, Color, Piece, Square, BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE,
    WHITE_QUEENSIDE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    MissingField(&'static str),
    BadPlacement(String),
    BadSideToMove(String),
    BadCastling(String),
    BadEnPassant(String),
    BadCounter(String),
    MissingKing,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::MissingField(field) => write!(f, "missing FEN field: {field}"),
            FenError::BadPlacement(s) => write!(f, "bad piece placement '{s}'"),
            FenError::BadSideToMove(s) => write!(f, "bad side to move '{s}'"),
            FenError::BadCastling(s) => write!(f, "bad castling rights '{s}'"),
            FenError::BadEnPassant(s) => write!(f, "bad en passant square '{s}'"),
            FenError::BadCounter(s) => write!(f, "bad move counter '{s}'"),
            FenError::MissingKing => write!(f, "each side needs exactly one king"),
        }
    }
}

impl std::error::Error for FenError {}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::MissingField("placement"))?;
        let side = fields.next().ok_or(FenError::MissingField("side to move"))?;
        let castling = fields.next().unwrap_or("-");
        let en_passant = fields.next().unwrap_or("-");
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Board::empty();

        let mut rank = 7usize;
        let mut file = 0usize;
        for c in placement.chars() {
            match c {
                '/' => {
                    if file != 8 || rank == 0 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += c as usize - '0' as usize;
                    if file > 8 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                }
                _ => {
                    let (color, piece) = Piece::from_fen_char(c)
                        .ok_or_else(|| FenError::BadPlacement(placement.to_string()))?;
                    if file > 7 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                    board.put_piece(color, piece, Square::new(rank, file));
                    file += 1;
                }
            }
        }
        if rank != 0 || file != 8 {
            return Err(FenError::BadPlacement(placement.to_string()));
        }
        if board.count(Color::White, Piece::King) != 1
            || board.count(Color::Black, Piece::King) != 1
        {
            return Err(FenError::MissingKing);
        }

        board.side = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::BadSideToMove(side.to_string())),
        };
        if board.side == Color::Black {
            board.key ^= zobrist::side_to_move();
        }

        if castling != "-" {
            for c in castling.chars() {
                board.castling_rights |= match c {
                    'K' => WHITE_KINGSIDE,
                    'Q' => WHITE_QUEENSIDE,
                    'k' => BLACK_KINGSIDE,
                    'q' => BLACK_QUEENSIDE,
                    _ => return Err(FenError::BadCastling(castling.to_string())),
                };
            }
        }
        board.key ^= zobrist::castling(board.castling_rights);

        if en_passant != "-" {
            let sq: Square = en_passant
                .parse()
                .map_err(|_| FenError::BadEnPassant(en_passant.to_string()))?;
            board.ep_square = Some(sq);
            board.key ^= zobrist::en_passant_file(sq.file());
        }

        board.halfmove_clock = halfmove
            .parse()
            .map_err(|_| FenError::BadCounter(halfmove.to_string()))?;
        let fullmove: u32 = fullmove
            .parse()
            .map_err(|_| FenError::BadCounter(fullmove.to_string()))?;
        board.game_ply =
            2 * fullmove.saturating_sub(1) + u32::from(board.side == Color::Black);

        Ok(board)
    }

    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    Some((color, piece)) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(piece.fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        let side = match self.side {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let ep = self
            .ep_square
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());
        format!(
            "{fen} {side} {} {ep} {} {}",
            rights_to_fen(self.castling_rights),
            self.halfmove_clock,
            self.game_ply / 2 + 1
        )
    }
}

impl FromStr for Board {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}
