//! Alpha-beta search.
//!
//! The search is organized around per-thread workers that share only the
//! transposition table and a handful of atomic flags. Each worker owns its
//! own board copy, search stack, history tables, and evaluation caches;
//! coordination is limited to TT traffic and the cooperative stop flag.

pub mod constants;
pub mod history;
pub(crate) mod movepick;

mod iterative;
mod negamax;
mod quiescence;
pub mod threads;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::board::eval::EvalContext;
use crate::board::nnue::NnueNetwork;
use crate::board::types::{Move, Piece, Value, MAX_PLY, VALUE_INFINITE};
use crate::board::Board;
use crate::engine::time::TimeManager;
use crate::tt::TranspositionTable;

use history::{
    ButterflyHistory, CaptureHistory, ContinuationHistory, CounterMoves, CONT_HISTORY_SENTINEL,
};

/// Frames below the root let the search read continuation histories for the
/// moves 1, 2, and 4 plies back without bounds checks.
pub(crate) const STACK_OFFSET: usize = 4;
pub(crate) const STACK_SIZE: usize = MAX_PLY + 7;

#[derive(Clone, Copy)]
pub(crate) struct StackFrame {
    pub killers: [Move; 2],
    pub current_move: Move,
    pub excluded_move: Move,
    /// (piece index, square) addressing the continuation-history grid.
    pub cont_hist: (usize, usize),
    /// Piece captured by `current_move`, if any.
    pub captured: Option<Piece>,
    pub move_count: i32,
    pub static_eval: Value,
    pub stat_score: i32,
}

impl StackFrame {
    pub(crate) fn zeroed() -> Self {
        StackFrame {
            killers: [Move::NONE; 2],
            current_move: Move::NONE,
            excluded_move: Move::NONE,
            cont_hist: CONT_HISTORY_SENTINEL,
            captured: None,
            move_count: 0,
            static_eval: 0,
            stat_score: 0,
        }
    }
}

/// One candidate move at the root with its running score and variation.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub mv: Move,
    pub score: Value,
    pub previous_score: Value,
    pub sel_depth: i32,
    pub pv: Vec<Move>,
}

impl RootMove {
    #[must_use]
    pub fn new(mv: Move) -> Self {
        RootMove {
            mv,
            score: -VALUE_INFINITE,
            previous_score: -VALUE_INFINITE,
            sel_depth: 0,
            pv: vec![mv],
        }
    }
}

/// Stable sort keeping unsearched moves (score `-INFINITE`) in their old
/// relative order, with the freshly searched PV bubbling to the front.
pub(crate) fn sort_root_moves(moves: &mut [RootMove]) {
    moves.sort_by(|a, b| {
        (b.score, b.previous_score).cmp(&(a.score, a.previous_score))
    });
}

/// What the `go` command asked for.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub mate: Option<i32>,
    pub infinite: bool,
    pub ponder: bool,
    pub searchmoves: Vec<Move>,
    /// Remaining clock per color (white, black), milliseconds.
    pub time: [Option<u64>; 2],
    pub inc: [u64; 2],
    pub movestogo: Option<u64>,
}

impl SearchLimits {
    #[must_use]
    pub fn use_time_management(&self) -> bool {
        self.time[0].is_some() || self.time[1].is_some()
    }
}

/// Which side of the window an iteration's score is known to be on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScoreBound {
    Exact,
    Lower,
    Upper,
}

/// One line of search progress, handed to the UCI layer for printing.
#[derive(Clone, Debug)]
pub struct SearchInfo {
    pub depth: i32,
    pub sel_depth: i32,
    pub multipv: usize,
    pub score: Value,
    pub bound: ScoreBound,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// State shared by every worker of one search.
pub struct SearchShared {
    pub tt: Arc<TranspositionTable>,
    pub stop: AtomicBool,
    pub ponder: AtomicBool,
    pub stop_on_ponderhit: AtomicBool,
    /// Per-worker node counters; summed for reporting and node limits.
    pub nodes: Vec<AtomicU64>,
    pub start: Instant,
    pub limits: SearchLimits,
    pub time: Option<TimeManager>,
    pub multipv: usize,
    pub nnue: Option<Arc<NnueNetwork>>,
    pub info: Option<InfoCallback>,
    /// Main thread's score from the previous search, for time heuristics.
    pub previous_score: Value,
    pub previous_time_reduction: f64,
}

impl SearchShared {
    #[must_use]
    pub fn nodes_searched(&self) -> u64 {
        self.nodes.iter().map(|n| n.load(Ordering::Relaxed)).sum()
    }

    #[inline]
    #[must_use]
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Per-thread state that outlives individual searches: histories decay
/// between searches instead of being cleared.
pub struct ThreadData {
    pub main_history: ButterflyHistory,
    pub capture_history: CaptureHistory,
    pub cont_history: ContinuationHistory,
    pub counter_moves: CounterMoves,
    pub eval: EvalContext,
}

impl ThreadData {
    #[must_use]
    pub fn new() -> Self {
        ThreadData {
            main_history: ButterflyHistory::new(),
            capture_history: CaptureHistory::new(),
            cont_history: ContinuationHistory::new(),
            counter_moves: CounterMoves::new(),
            eval: EvalContext::new(),
        }
    }

    /// Between searches: histories fade, tactical helpers reset.
    pub fn new_search(&mut self) {
        self.main_history.decay();
        self.capture_history.decay();
        self.counter_moves.clear();
    }
}

impl Default for ThreadData {
    fn default() -> Self {
        ThreadData::new()
    }
}

/// A live worker: everything one thread needs for one search.
pub(crate) struct SearchWorker<'a> {
    pub id: usize,
    pub board: Board,
    pub td: &'a mut ThreadData,
    pub shared: &'a SearchShared,
    pub root_moves: Vec<RootMove>,
    pub stack: Vec<StackFrame>,
    pub root_depth: i32,
    pub completed_depth: i32,
    pub sel_depth: i32,
    pub pv_idx: usize,
    /// Null-move verification guard: plies where null moves are banned for
    /// one side, encoded as a ply floor plus parity.
    pub nmp_ply: i32,
    pub nmp_odd: i32,
    pub best_move_changes: f64,
    pub failed_low: bool,
    pub time_reduction: f64,
    calls_cnt: i32,
}

impl<'a> SearchWorker<'a> {
    pub fn new(
        id: usize,
        board: Board,
        td: &'a mut ThreadData,
        shared: &'a SearchShared,
        root_moves: Vec<RootMove>,
    ) -> Self {
        SearchWorker {
            id,
            board,
            td,
            shared,
            root_moves,
            stack: vec![StackFrame::zeroed(); STACK_SIZE],
            root_depth: 0,
            completed_depth: 0,
            sel_depth: 0,
            pv_idx: 0,
            nmp_ply: 0,
            nmp_odd: 0,
            best_move_changes: 0.0,
            failed_low: false,
            time_reduction: 1.0,
            calls_cnt: 1,
        }
    }

    #[inline]
    pub fn is_main(&self) -> bool {
        self.id == 0
    }

    #[inline]
    pub fn local_nodes(&self) -> u64 {
        self.shared.nodes[self.id].load(Ordering::Relaxed)
    }

    /// Counts one node; the main thread also polls the clock here.
    #[inline]
    pub fn count_node(&mut self) {
        self.shared.nodes[self.id].fetch_add(1, Ordering::Relaxed);
        if self.is_main() {
            self.check_time();
        }
    }

    /// Static evaluation via the neural network when one is loaded, the
    /// classical evaluator otherwise.
    pub fn evaluate(&mut self) -> Value {
        match &self.shared.nnue {
            Some(net) => {
                let nodes = self.local_nodes();
                crate::board::nnue::evaluate_hybrid(net, &mut self.td.eval, &self.board, nodes)
            }
            None => self.td.eval.evaluate(&self.board),
        }
    }

    /// Wall-clock poll on a 4096-node cadence (denser under a node limit).
    fn check_time(&mut self) {
        self.calls_cnt -= 1;
        if self.calls_cnt > 0 {
            return;
        }
        self.calls_cnt = match self.shared.limits.nodes {
            Some(n) => (n / 1024).clamp(1, 4096) as i32,
            None => 4096,
        };

        // A pondering engine stops only on the GUI's say-so.
        if self.shared.ponder.load(Ordering::Relaxed) {
            return;
        }

        let elapsed = self.shared.elapsed_ms();
        let out_of_time = self
            .shared
            .time
            .as_ref()
            .is_some_and(|tm| elapsed > tm.maximum_ms().saturating_sub(10))
            || self.shared.limits.movetime.is_some_and(|mt| elapsed >= mt)
            || self
                .shared
                .limits
                .nodes
                .is_some_and(|n| self.shared.nodes_searched() >= n);
        if out_of_time {
            self.shared.stop.store(true, Ordering::Relaxed);
        }
    }
}
