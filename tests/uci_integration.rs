//! UCI-facing behavior: command round trips and output formatting.

use graphite::board::search::{ScoreBound, SearchInfo};
use graphite::board::types::{mate_in, Move, Square};
use graphite::uci::command::{parse_go_params, parse_uci_command, UciCommand};
use graphite::uci::report::{format_bestmove, format_info, format_score};
use graphite::uci::parse_position;

#[test]
fn position_startpos_builds_the_initial_position() {
    let board = parse_position(&["position", "startpos"]).unwrap();
    assert_eq!(
        board.to_fen(),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

#[test]
fn position_fen_with_moves() {
    let board = parse_position(&[
        "position",
        "fen",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",
        "w",
        "KQkq",
        "-",
        "0",
        "1",
        "moves",
        "e2e4",
        "c7c5",
    ])
    .unwrap();
    assert!(board.to_fen().starts_with("rnbqkbnr/pp1ppppp/8/2p5/4P3/8"));
}

#[test]
fn illegal_gui_move_is_reported_not_applied() {
    let result = parse_position(&["position", "startpos", "moves", "e2e4", "e2e4"]);
    assert!(result.is_err());
}

#[test]
fn go_command_carries_through_parser() {
    let cmd = parse_uci_command("go wtime 60000 btime 60000 winc 600 binc 600").unwrap();
    let UciCommand::Go(parts) = cmd else {
        panic!("expected go command");
    };
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let params = parse_go_params(&parts);
    assert_eq!(params.wtime, Some(60_000));
    assert_eq!(params.binc, Some(600));
}

#[test]
fn score_strings_match_the_protocol() {
    assert_eq!(format_score(17), "cp 17");
    assert_eq!(format_score(mate_in(5)), "mate 3");
    assert_eq!(format_score(-(mate_in(4))), "mate -2");
}

#[test]
fn info_lines_include_bounds_on_aspiration_failures() {
    let base = SearchInfo {
        depth: 8,
        sel_depth: 12,
        multipv: 1,
        score: 100,
        bound: ScoreBound::Lower,
        nodes: 1000,
        nps: 10_000,
        time_ms: 100,
        hashfull: 0,
        pv: vec![Move::new(Square::from_index(12), Square::from_index(28))],
    };
    assert!(format_info(&base).contains(" lowerbound "));
    let upper = SearchInfo {
        bound: ScoreBound::Upper,
        ..base.clone()
    };
    assert!(format_info(&upper).contains(" upperbound "));
    let exact = SearchInfo {
        bound: ScoreBound::Exact,
        ..base
    };
    assert!(!format_info(&exact).contains("bound"));
}

#[test]
fn bestmove_with_and_without_ponder() {
    let best = Move::new(Square::from_index(12), Square::from_index(28));
    let reply = Move::new(Square::from_index(52), Square::from_index(36));
    assert_eq!(format_bestmove(best, Some(reply)), "bestmove e2e4 ponder e7e5");
    assert_eq!(format_bestmove(best, None), "bestmove e2e4");
    assert_eq!(format_bestmove(Move::NONE, None), "bestmove (none)");
}
