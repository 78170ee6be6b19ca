//! Pluggable neural evaluator.
//!
//! The network itself is an external artifact: a 768 -> 256 -> 1
//! dual-perspective net in a little-endian `.nnue` blob. This module loads
//! it (working directory first, then the engine binary's directory) and
//! decides per position whether the network or the classical evaluator
//! produces the score.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use crate::board::eval::EvalContext;
use crate::board::types::{Color, Piece, Value, ALL_PIECES, PAWN_MG, ROOK_MG, TEMPO};
use crate::board::Board;

/// Input feature count: 64 squares x 6 piece types x 2 colors.
pub const INPUT_SIZE: usize = 768;
pub const HIDDEN_SIZE: usize = 256;

/// Quantization constants matching the training pipeline.
const QA: i32 = 255;
const QB: i32 = 64;
const SCALE: i32 = 400;

/// Name the engine looks for when no `EvalFile` was configured.
pub const DEFAULT_EVAL_FILE: &str = "nn-c3a59f5f8b4f.nnue";

/// Networks are named `nn-<12 hex/lowercase chars>.nnue`.
#[must_use]
pub fn is_valid_eval_file_name(name: &str) -> bool {
    let Some(stem) = name.strip_prefix("nn-") else {
        return false;
    };
    let Some(hash) = stem.strip_suffix(".nnue") else {
        return false;
    };
    hash.len() == 12
        && hash
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

pub struct NnueNetwork {
    feature_weights: Box<[[i16; HIDDEN_SIZE]; INPUT_SIZE]>,
    feature_bias: [i16; HIDDEN_SIZE],
    output_weights: [[i16; HIDDEN_SIZE]; 2],
    output_bias: i16,
    /// Where the blob came from, for the startup diagnostic.
    pub source: String,
}

impl NnueNetwork {
    fn from_reader<R: Read>(reader: &mut R, source: String) -> std::io::Result<Self> {
        fn read_i16<R: Read>(reader: &mut R) -> std::io::Result<i16> {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(i16::from_le_bytes(buf))
        }

        let mut feature_weights = Box::new([[0i16; HIDDEN_SIZE]; INPUT_SIZE]);
        for row in feature_weights.iter_mut() {
            for w in row.iter_mut() {
                *w = read_i16(reader)?;
            }
        }
        let mut feature_bias = [0i16; HIDDEN_SIZE];
        for b in &mut feature_bias {
            *b = read_i16(reader)?;
        }
        let mut output_weights = [[0i16; HIDDEN_SIZE]; 2];
        for side in &mut output_weights {
            for w in side.iter_mut() {
                *w = read_i16(reader)?;
            }
        }
        let output_bias = read_i16(reader)?;

        Ok(NnueNetwork {
            feature_weights,
            feature_bias,
            output_weights,
            output_bias,
            source,
        })
    }

    pub fn from_bytes(data: &[u8], source: String) -> std::io::Result<Self> {
        let mut cursor = std::io::Cursor::new(data);
        Self::from_reader(&mut cursor, source)
    }

    /// Tries the load locations in order, stopping at the first success.
    #[must_use]
    pub fn load(eval_file: &str) -> Option<Self> {
        if !is_valid_eval_file_name(eval_file) {
            return None;
        }

        let mut candidates: Vec<PathBuf> = vec![PathBuf::from(eval_file)];
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join(eval_file));
            }
        }
        for path in candidates {
            if let Ok(file) = File::open(&path) {
                let mut reader = BufReader::new(file);
                if let Ok(net) =
                    Self::from_reader(&mut reader, path.display().to_string())
                {
                    return Some(net);
                }
            }
        }
        None
    }

    /// Raw network output from the side to move's perspective.
    #[must_use]
    pub fn evaluate(&self, board: &Board) -> Value {
        let mut accumulators = [self.feature_bias; 2];
        for color in [Color::White, Color::Black] {
            for piece in ALL_PIECES {
                for sq in board.pieces(color, piece) {
                    for perspective in 0..2 {
                        let feature =
                            feature_index(piece, color, sq.index(), perspective);
                        let weights = &self.feature_weights[feature];
                        let acc = &mut accumulators[perspective];
                        for (a, &w) in acc.iter_mut().zip(weights.iter()) {
                            *a += w;
                        }
                    }
                }
            }
        }

        let stm = board.side_to_move().index();
        let us = screlu_dot(&accumulators[stm], &self.output_weights[stm]);
        let them = screlu_dot(&accumulators[1 - stm], &self.output_weights[1 - stm]);
        let output = us + them + i32::from(self.output_bias) * QA;
        output * SCALE / (QA * QA * QB)
    }
}

/// Squared clipped ReLU dot product.
fn screlu_dot(acc: &[i16; HIDDEN_SIZE], weights: &[i16; HIDDEN_SIZE]) -> i32 {
    let mut sum = 0i64;
    for (&a, &w) in acc.iter().zip(weights.iter()) {
        let clipped = i64::from(i32::from(a).clamp(0, QA));
        sum += clipped * clipped * i64::from(w);
    }
    (sum / i64::from(QA)) as i32
}

/// Feature layout: perspective-relative color, then piece type, then square
/// (rank-flipped for black's view).
#[inline]
#[must_use]
fn feature_index(piece: Piece, color: Color, square: usize, perspective: usize) -> usize {
    let (sq, pc_color) = if perspective == 1 {
        (square ^ 56, 1 - color.index())
    } else {
        (square, color.index())
    };
    pc_color * 384 + piece.index() * 64 + sq
}

/// Blend policy: the network carries balanced middlegame positions, the
/// classical evaluator keeps lopsided material and low-piece endgames where
/// its drawishness knowledge matters.
#[must_use]
pub fn evaluate_hybrid(
    net: &NnueNetwork,
    classical: &mut EvalContext,
    board: &Board,
    nodes: u64,
) -> Value {
    let psq = board.psq_score().eg.abs();
    let npm = board.total_non_pawn_material();
    let pawns = board.pieces_of_type(Piece::Pawn).popcount() as i32;
    let r50 = 16 + board.halfmove_clock() as i32;

    let large_psq = psq * 16 > (682 + npm / 64) * r50;
    let use_classical = large_psq || (psq > PAWN_MG / 4 && nodes & 0xB == 0);
    let strong_classical = npm < 2 * ROOK_MG && pawns < 2;

    let adjusted_nnue = |b: &Board| {
        let material = npm + PAWN_MG * pawns;
        net.evaluate(b) * (679 + material / 32) / 1024 + TEMPO
    };

    let mut v = if use_classical || strong_classical {
        classical.evaluate(board)
    } else {
        adjusted_nnue(board)
    };

    // A small classical verdict under a large imbalance is suspicious; let
    // the network overrule it, always for near-draws and probabilistically
    // for opposite-colored bishops.
    if large_psq
        && !strong_classical
        && (v.abs() * 16 < 176 * r50
            || (board.opposite_bishops()
                && v.abs() * 16 < (682 + npm / 64) * r50
                && nodes & 0xB == 0))
    {
        v = adjusted_nnue(board);
    }

    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_file_names_are_validated() {
        assert!(is_valid_eval_file_name("nn-62ef826d1a6d.nnue"));
        assert!(is_valid_eval_file_name(DEFAULT_EVAL_FILE));
        assert!(!is_valid_eval_file_name("nn-UPPERCASE00.nnue"));
        assert!(!is_valid_eval_file_name("nn-short.nnue"));
        assert!(!is_valid_eval_file_name("weights.bin"));
        assert!(!is_valid_eval_file_name("nn-62ef826d1a6d.bin"));
    }

    #[test]
    fn zero_network_evaluates_to_zero() {
        let byte_count = (INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE + 2 * HIDDEN_SIZE + 1) * 2;
        let blob = vec![0u8; byte_count];
        let net = NnueNetwork::from_bytes(&blob, "test".to_string()).unwrap();
        let board = Board::new();
        assert_eq!(net.evaluate(&board), 0);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let blob = vec![0u8; 100];
        assert!(NnueNetwork::from_bytes(&blob, "test".to_string()).is_err());
    }

    #[test]
    fn missing_file_fails_to_load() {
        assert!(NnueNetwork::load("nn-000000000000.nnue").is_none());
    }
}
