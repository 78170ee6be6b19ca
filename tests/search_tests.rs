//! Engine-level integration tests: the full go/stop/bestmove cycle.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use graphite::board::search::SearchLimits;
use graphite::engine::Engine;
use graphite::uci::parse_position;

type BestMove = (String, Option<String>);

fn engine_with_channel() -> (Engine, mpsc::Receiver<BestMove>) {
    let (tx, rx) = mpsc::channel();
    let mut engine = Engine::new();
    engine.set_bestmove_callback(Arc::new(move |best, ponder| {
        tx.send((best.to_string(), ponder.map(|m| m.to_string()))).ok();
    }));
    (engine, rx)
}

fn depth_limits(depth: i32) -> SearchLimits {
    SearchLimits {
        depth: Some(depth),
        ..SearchLimits::default()
    }
}

#[test]
fn fools_mate_from_uci_position() {
    let (mut engine, rx) = engine_with_channel();
    let board =
        parse_position(&["position", "startpos", "moves", "f2f3", "e7e5", "g2g4"]).unwrap();
    engine.set_position(board);
    engine.go(depth_limits(1));
    let (best, _) = rx.recv_timeout(Duration::from_secs(20)).unwrap();
    assert_eq!(best, "d8h4");
}

#[test]
fn movetime_is_respected() {
    let (mut engine, rx) = engine_with_channel();
    engine.go(SearchLimits {
        movetime: Some(300),
        ..SearchLimits::default()
    });
    let start = Instant::now();
    let (best, _) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    let elapsed = start.elapsed();
    assert_ne!(best, "0000");
    assert!(
        elapsed < Duration::from_millis(1500),
        "took {elapsed:?} for movetime 300"
    );
}

#[test]
fn infinite_search_stops_on_command() {
    let (mut engine, rx) = engine_with_channel();
    engine.go(SearchLimits {
        infinite: true,
        ..SearchLimits::default()
    });
    std::thread::sleep(Duration::from_millis(100));
    engine.stop();
    let (best, _) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_ne!(best, "0000");
}

#[test]
fn clock_driven_search_terminates_promptly() {
    let (mut engine, rx) = engine_with_channel();
    engine.go(SearchLimits {
        time: [Some(1000), Some(1000)],
        inc: [0, 0],
        ..SearchLimits::default()
    });
    let start = Instant::now();
    let _ = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn mate_limit_stops_the_search() {
    let (mut engine, rx) = engine_with_channel();
    let board = parse_position(&["position", "fen", "6k1/5ppp/8/8/8/8/8/4Q2K", "w", "-", "-", "0", "1"])
        .unwrap();
    engine.set_position(board);
    engine.go(SearchLimits {
        mate: Some(1),
        ..SearchLimits::default()
    });
    let (best, _) = rx.recv_timeout(Duration::from_secs(20)).unwrap();
    assert_eq!(best, "e1e8");
}

#[test]
fn multiple_threads_deliver_a_bestmove() {
    let (mut engine, rx) = engine_with_channel();
    engine.set_option("Threads", "2").unwrap();
    engine.go(depth_limits(6));
    let (best, _) = rx.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_ne!(best, "0000");
    assert_ne!(best, "(none)");
}

#[test]
fn new_game_resets_between_searches() {
    let (mut engine, rx) = engine_with_channel();
    engine.go(depth_limits(4));
    rx.recv_timeout(Duration::from_secs(20)).unwrap();
    engine.new_game();
    engine.go(depth_limits(4));
    let (best, _) = rx.recv_timeout(Duration::from_secs(20)).unwrap();
    assert_ne!(best, "(none)");
}

#[test]
fn stalemate_reports_no_move() {
    let (mut engine, rx) = engine_with_channel();
    let board = parse_position(&["position", "fen", "7k/5Q2/6K1/8/8/8/8/8", "b", "-", "-", "0", "1"])
        .unwrap();
    engine.set_position(board);
    engine.go(depth_limits(4));
    let (best, _) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(best, "0000");
}

#[test]
fn setoption_validates_names() {
    let mut engine = Engine::new();
    assert!(engine.set_option("Hash", "32").is_ok());
    assert!(engine.set_option("MultiPV", "3").is_ok());
    assert!(engine.set_option("UCI_Chess960", "true").is_ok());
    assert!(engine.set_option("Bogus", "1").is_err());
}

#[test]
fn nnue_misconfiguration_is_fatal_at_verify() {
    let mut engine = Engine::new();
    engine.set_option("Use NNUE", "true").unwrap();
    engine
        .set_option("EvalFile", "nn-000000000000.nnue")
        .unwrap();
    let err = engine.verify_nnue().unwrap_err();
    assert_eq!(err.len(), 5);
    assert!(err.iter().all(|line| line.starts_with("ERROR:")));
}
