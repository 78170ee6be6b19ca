//! Universal Chess Interface front end.
//!
//! One blocking loop over stdin. Commands mutate the `Engine`; search output
//! flows back through callbacks and is printed here. All recoverable errors
//! are reported as `info string` diagnostics and otherwise ignored, as the
//! protocol expects.

pub mod command;
pub mod report;

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::board::movegen::MoveParseError;
use crate::board::search::SearchLimits;
use crate::board::{Board, FenError};
use crate::engine::Engine;

use command::{parse_go_params, parse_setoption, parse_uci_command, GoParams, UciCommand};

pub const ENGINE_NAME: &str = "Graphite";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors from the `position` command.
#[derive(Debug, Clone)]
pub enum UciError {
    InvalidFen(FenError),
    InvalidMove { move_str: String, error: MoveParseError },
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "invalid fen: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "incomplete position command"),
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

/// Parses `position [startpos|fen ...] [moves ...]` into a board.
pub fn parse_position(parts: &[&str]) -> Result<Board, UciError> {
    let mut i = 1;
    let mut board = if parts.get(i) == Some(&"startpos") {
        i += 1;
        Board::new()
    } else if parts.get(i) == Some(&"fen") {
        let moves_idx = parts
            .iter()
            .position(|p| *p == "moves")
            .unwrap_or(parts.len());
        if i + 1 >= moves_idx {
            return Err(UciError::MissingParts);
        }
        let fen = parts[i + 1..moves_idx].join(" ");
        i = moves_idx;
        Board::from_fen(&fen)?
    } else {
        return Err(UciError::MissingParts);
    };

    if parts.get(i) == Some(&"moves") {
        for token in &parts[i + 1..] {
            let mv = board
                .parse_move(token)
                .map_err(|error| UciError::InvalidMove {
                    move_str: (*token).to_string(),
                    error,
                })?;
            board.make_move(mv);
        }
    }
    Ok(board)
}

fn build_limits(engine: &Engine, params: &GoParams) -> SearchLimits {
    let mut searchmoves = Vec::new();
    if !params.searchmoves.is_empty() {
        let mut board = engine.board().clone();
        for token in &params.searchmoves {
            if let Ok(mv) = board.parse_move(token) {
                searchmoves.push(mv);
            }
        }
    }
    SearchLimits {
        depth: params.depth,
        nodes: params.nodes,
        movetime: params.movetime,
        mate: params.mate,
        infinite: params.infinite,
        ponder: params.ponder,
        searchmoves,
        time: [params.wtime, params.btime],
        inc: [params.winc.unwrap_or(0), params.binc.unwrap_or(0)],
        movestogo: params.movestogo,
    }
}

fn print_id_and_options(engine: &Engine) {
    println!("id name {ENGINE_NAME} {ENGINE_VERSION}");
    println!("id author the {ENGINE_NAME} developers");
    let o = &engine.options;
    println!("option name Threads type spin default {} min 1 max 512", o.threads);
    println!("option name Hash type spin default {} min 1 max 131072", o.hash_mb);
    println!("option name MultiPV type spin default {} min 1 max 500", o.multipv);
    println!("option name Ponder type check default {}", o.ponder);
    println!("option name Use NNUE type check default {}", o.use_nnue);
    println!("option name EvalFile type string default {}", o.eval_file);
    println!("option name UCI_Chess960 type check default {}", o.chess960);
    println!("uciok");
}

fn handle_go(engine: &mut Engine, parts: &[&str]) {
    let params = parse_go_params(parts);

    if let Some(depth) = params.perft {
        let nodes = engine.perft(depth);
        println!("Nodes searched: {nodes}");
        return;
    }

    match engine.verify_nnue() {
        Ok(Some(msg)) => println!("info string {msg}"),
        Ok(None) => println!("info string classical evaluation enabled"),
        Err(lines) => {
            for line in lines {
                println!("info string {line}");
            }
            io::stdout().flush().ok();
            std::process::exit(1);
        }
    }

    let limits = build_limits(engine, &params);
    engine.go(limits);
}

/// The blocking command loop; returns the process exit code.
pub fn run() -> i32 {
    let mut engine = Engine::new();
    engine.set_info_callback(Arc::new(|info| {
        println!("{}", report::format_info(info));
    }));
    engine.set_bestmove_callback(Arc::new(|best, ponder| {
        println!("{}", report::format_bestmove(best, ponder));
        io::stdout().flush().ok();
    }));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Some(cmd) = parse_uci_command(&line) else {
            continue;
        };

        match cmd {
            UciCommand::Uci => print_id_and_options(&engine),
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => {
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_position(&parts) {
                    Ok(board) => engine.set_position(board),
                    Err(e) => println!("info string {e}"),
                }
            }
            UciCommand::SetOption(parts) => {
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_setoption(&parts) {
                    Some((name, value)) => {
                        if let Err(e) = engine.set_option(&name, &value) {
                            println!("info string {e}");
                        }
                    }
                    None => println!("info string malformed setoption"),
                }
            }
            UciCommand::Go(parts) => {
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                handle_go(&mut engine, &parts);
            }
            UciCommand::Stop => {
                engine.stop();
                engine.wait_for_bestmove();
            }
            UciCommand::PonderHit => engine.ponderhit(),
            UciCommand::Quit => break,
            UciCommand::Unknown(s) => println!("info string unknown command '{s}'"),
        }
        io::stdout().flush().ok();
    }

    engine.wait_for_search_finished();
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::Color;

    #[test]
    fn position_startpos_with_moves() {
        let board =
            parse_position(&["position", "startpos", "moves", "e2e4", "e7e5"]).unwrap();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.game_ply(), 2);
    }

    #[test]
    fn position_fen() {
        let board = parse_position(&[
            "position", "fen", "4k3", "8", "8", "8", "8", "8", "8", "4K3", "w", "-", "-", "0",
            "1",
        ]);
        // FEN arrives pre-tokenized; rejoining must reconstruct it.
        assert!(board.is_err());

        let board = parse_position(&[
            "position",
            "fen",
            "4k3/8/8/8/8/8/8/4K3",
            "w",
            "-",
            "-",
            "0",
            "1",
        ])
        .unwrap();
        assert_eq!(board.side_to_move(), Color::White);
    }

    #[test]
    fn position_rejects_illegal_moves() {
        let result = parse_position(&["position", "startpos", "moves", "e2e5"]);
        assert!(matches!(result, Err(UciError::InvalidMove { .. })));
    }

    #[test]
    fn position_requires_a_source() {
        assert!(matches!(
            parse_position(&["position"]),
            Err(UciError::MissingParts)
        ));
    }
}
