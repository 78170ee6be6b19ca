//! Lazy SMP: every thread runs the same iterative deepening on its own board
//! copy, sharing only the transposition table and the stop flag. The caller's
//! thread doubles as the main worker; helpers are scoped threads.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::board::types::{Move, Value, VALUE_DRAW, VALUE_MATE, VALUE_MATE_IN_MAX_PLY};
use crate::board::Board;

use super::{
    RootMove, ScoreBound, SearchInfo, SearchShared, SearchWorker, ThreadData,
};

/// How often the post-search ponder/infinite wait polls the stop flag.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Stack size for helper threads; the search recursion is deep.
pub const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

pub struct SearchOutcome {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub score: Value,
    /// Main thread's stability rebate, persisted for the next search.
    pub time_reduction: f64,
}

struct WorkerResult {
    root_moves: Vec<RootMove>,
    completed_depth: i32,
}

/// Runs one full search on the calling thread plus `threads.len() - 1`
/// helpers, returning the pool's agreed best move.
pub fn run_search(
    board: &Board,
    threads: &mut [ThreadData],
    shared: &Arc<SearchShared>,
) -> SearchOutcome {
    let mut root_board = board.clone();
    let legal = root_board.generate_moves();
    let root_moves: Vec<RootMove> = legal
        .iter()
        .filter(|m| {
            shared.limits.searchmoves.is_empty() || shared.limits.searchmoves.contains(m)
        })
        .map(|&m| RootMove::new(m))
        .collect();

    if root_moves.is_empty() {
        // Mate or stalemate at the root: report and bail out.
        if let Some(cb) = &shared.info {
            cb(&SearchInfo {
                depth: 0,
                sel_depth: 0,
                multipv: 1,
                score: if root_board.checkers().any() {
                    -VALUE_MATE
                } else {
                    VALUE_DRAW
                },
                bound: ScoreBound::Exact,
                nodes: 0,
                nps: 0,
                time_ms: 0,
                hashfull: 0,
                pv: Vec::new(),
            });
        }
        return SearchOutcome {
            best_move: Move::NONE,
            ponder_move: None,
            score: VALUE_DRAW,
            time_reduction: shared.previous_time_reduction,
        };
    }

    shared.tt.new_search();

    let multipv = shared.multipv;
    let (main_result, helper_results, time_reduction) = thread::scope(|scope| {
        let mut iter = threads.iter_mut().enumerate();
        let (_, main_td) = iter.next().expect("at least one search thread");

        let mut handles = Vec::new();
        for (id, td) in iter {
            let helper_board = board.clone();
            let helper_roots = root_moves.clone();
            let shared_ref: &SearchShared = shared;
            let builder = thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(SEARCH_STACK_SIZE);
            let handle = builder
                .spawn_scoped(scope, move || {
                    let mut worker =
                        SearchWorker::new(id, helper_board, td, shared_ref, helper_roots);
                    worker.iterative_deepening();
                    WorkerResult {
                        root_moves: worker.root_moves,
                        completed_depth: worker.completed_depth,
                    }
                })
                .expect("failed to spawn search worker");
            handles.push(handle);
        }

        let mut main_worker =
            SearchWorker::new(0, board.clone(), main_td, shared, root_moves.clone());
        main_worker.iterative_deepening();

        // Protocol: with ponder or infinite active, the best move may only be
        // announced after the GUI's stop (or a ponderhit-triggered stop).
        shared.stop_on_ponderhit.store(true, Ordering::Relaxed);
        while !shared.stopped()
            && (shared.ponder.load(Ordering::Relaxed) || shared.limits.infinite)
        {
            thread::sleep(IDLE_POLL);
        }
        shared.stop.store(true, Ordering::Relaxed);

        let main_result = WorkerResult {
            root_moves: main_worker.root_moves.clone(),
            completed_depth: main_worker.completed_depth,
        };
        let helper_results: Vec<WorkerResult> = handles
            .into_iter()
            .map(|h| h.join().expect("search worker panicked"))
            .collect();
        (main_result, helper_results, main_worker.time_reduction)
    });

    // Pick the best thread: higher score at no less depth, mates always win.
    let mut best = &main_result;
    if multipv == 1 && main_result.root_moves[0].mv.is_some() {
        for result in &helper_results {
            if result.root_moves.is_empty() {
                continue;
            }
            let depth_diff = result.completed_depth - best.completed_depth;
            let score_diff = result.root_moves[0].score - best.root_moves[0].score;
            if score_diff > 0
                && (depth_diff >= 0 || result.root_moves[0].score >= VALUE_MATE_IN_MAX_PLY)
            {
                best = result;
            }
        }
    }

    let best_root = &best.root_moves[0];
    // A helper outvoting the main thread owes the GUI one final PV line.
    if !std::ptr::eq(best, &main_result) {
        if let Some(cb) = &shared.info {
            let elapsed = shared.elapsed_ms().max(1);
            let nodes = shared.nodes_searched();
            cb(&SearchInfo {
                depth: best.completed_depth.max(1),
                sel_depth: best_root.sel_depth,
                multipv: 1,
                score: best_root.score,
                bound: ScoreBound::Exact,
                nodes,
                nps: nodes * 1000 / elapsed,
                time_ms: elapsed,
                hashfull: shared.tt.hashfull(),
                pv: best_root.pv.clone(),
            });
        }
    }

    let best_move = best_root.mv;
    let ponder_move = best_root.pv.get(1).copied().or_else(|| {
        extract_ponder_from_tt(board, shared, best_move)
    });

    SearchOutcome {
        best_move,
        ponder_move,
        score: best_root.score,
        time_reduction,
    }
}

/// When the PV is a single move (a stop during a root fail-high, say), try
/// hard to still have something to ponder on.
fn extract_ponder_from_tt(board: &Board, shared: &SearchShared, best_move: Move) -> Option<Move> {
    if !best_move.is_some() {
        return None;
    }
    let mut probe_board = board.clone();
    let info = probe_board.make_move(best_move);
    let ponder = shared
        .tt
        .probe(probe_board.key(), 0)
        .map(|t| t.mv)
        .filter(|&mv| mv.is_some() && probe_board.generate_moves().contains(mv));
    probe_board.unmake_move(best_move, info);
    ponder
}
