//! The engine context.
//!
//! `Engine` owns what the search borrows: the transposition table, the
//! persistent per-thread state, the option set, and the active search job.
//! The UCI layer drives it; nothing in here reads or writes the terminal
//! except through the provided callbacks.

pub mod time;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::nnue::{self, NnueNetwork};
use crate::board::search::threads::{self, SEARCH_STACK_SIZE};
use crate::board::search::{InfoCallback, SearchLimits, SearchShared, ThreadData};
use crate::board::types::{Move, Value};
use crate::board::Board;
use crate::tt::TranspositionTable;

use time::TimeManager;

pub type BestMoveCallback = Arc<dyn Fn(Move, Option<Move>) + Send + Sync>;

/// The closed option set exposed over UCI.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub threads: usize,
    pub hash_mb: usize,
    pub multipv: usize,
    pub ponder: bool,
    pub use_nnue: bool,
    pub eval_file: String,
    pub chess960: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            threads: 1,
            hash_mb: 16,
            multipv: 1,
            ponder: false,
            use_nnue: false,
            eval_file: nnue::DEFAULT_EVAL_FILE.to_string(),
            chess960: false,
        }
    }
}

/// Main-thread quantities carried from one search to the next for the time
/// heuristics.
struct Persist {
    previous_score: Value,
    previous_time_reduction: f64,
}

struct SearchJob {
    shared: Arc<SearchShared>,
    handle: JoinHandle<()>,
}

pub struct Engine {
    board: Board,
    tt: Arc<TranspositionTable>,
    threads: Arc<Mutex<Vec<ThreadData>>>,
    pub options: EngineOptions,
    nnue: Option<Arc<NnueNetwork>>,
    info_callback: Option<InfoCallback>,
    bestmove_callback: Option<BestMoveCallback>,
    persist: Arc<Mutex<Persist>>,
    job: Option<SearchJob>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        let options = EngineOptions::default();
        Engine {
            board: Board::new(),
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            threads: Arc::new(Mutex::new(vec![ThreadData::new()])),
            options,
            nnue: None,
            info_callback: None,
            bestmove_callback: None,
            persist: Arc::new(Mutex::new(Persist {
                previous_score: 0,
                previous_time_reduction: 1.0,
            })),
            job: None,
        }
    }

    pub fn set_info_callback(&mut self, cb: InfoCallback) {
        self.info_callback = Some(cb);
    }

    pub fn set_bestmove_callback(&mut self, cb: BestMoveCallback) {
        self.bestmove_callback = Some(cb);
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn set_position(&mut self, mut board: Board) {
        self.wait_for_search_finished();
        board.set_chess960(self.options.chess960);
        self.board = board;
    }

    /// `ucinewgame`: everything learned about the previous game goes.
    pub fn new_game(&mut self) {
        self.wait_for_search_finished();
        self.tt.clear();
        let mut threads = self.threads.lock();
        for td in threads.iter_mut() {
            *td = ThreadData::new();
        }
        drop(threads);
        let mut persist = self.persist.lock();
        persist.previous_score = 0;
        persist.previous_time_reduction = 1.0;
        self.board = Board::new();
        self.board.set_chess960(self.options.chess960);
    }

    /// Applies a `setoption`. Unknown names are reported back to the caller.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "Threads" => {
                let n: usize = value.parse().map_err(|_| format!("bad value '{value}'"))?;
                self.wait_for_search_finished();
                self.options.threads = n.clamp(1, 512);
            }
            "Hash" => {
                let mb: usize = value.parse().map_err(|_| format!("bad value '{value}'"))?;
                self.wait_for_search_finished();
                self.options.hash_mb = mb.clamp(1, 131_072);
                self.tt = Arc::new(TranspositionTable::new(self.options.hash_mb));
                #[cfg(feature = "logging")]
                log::debug!("transposition table resized to {} MB", self.options.hash_mb);
            }
            "MultiPV" => {
                let k: usize = value.parse().map_err(|_| format!("bad value '{value}'"))?;
                self.options.multipv = k.clamp(1, 500);
            }
            "Ponder" => self.options.ponder = value == "true",
            "Use NNUE" => {
                self.options.use_nnue = value == "true";
                self.reload_nnue();
            }
            "EvalFile" => {
                self.options.eval_file = value.to_string();
                self.reload_nnue();
            }
            "UCI_Chess960" => {
                self.options.chess960 = value == "true";
                self.board.set_chess960(self.options.chess960);
            }
            _ => return Err(format!("unknown option '{name}'")),
        }
        Ok(())
    }

    fn reload_nnue(&mut self) {
        self.nnue = if self.options.use_nnue {
            NnueNetwork::load(&self.options.eval_file).map(Arc::new)
        } else {
            None
        };
    }

    /// Checks the NNUE configuration before a search. On inconsistency the
    /// returned lines must be printed and the process terminated.
    pub fn verify_nnue(&self) -> Result<Option<String>, Vec<String>> {
        if !self.options.use_nnue {
            return Ok(None);
        }
        match &self.nnue {
            Some(net) => Ok(Some(format!(
                "NNUE evaluation using {} ({})",
                self.options.eval_file, net.source
            ))),
            None => {
                let file = &self.options.eval_file;
                Err(vec![
                    "ERROR: If the UCI option \"Use NNUE\" is set to true, a compatible network file must be available.".to_string(),
                    format!("ERROR: The option is set to true, but the network file {file} was not loaded successfully."),
                    "ERROR: The UCI option EvalFile might need to specify the full path to the network file.".to_string(),
                    format!("ERROR: The engine searched the working directory and its own directory for {file}."),
                    "ERROR: The engine will be terminated now.".to_string(),
                ])
            }
        }
    }

    /// Starts a search in the background; `bestmove` arrives via callback.
    pub fn go(&mut self, limits: SearchLimits) {
        self.wait_for_search_finished();

        let thread_count = self.options.threads;
        {
            let mut threads = self.threads.lock();
            threads.resize_with(thread_count, ThreadData::new);
            for td in threads.iter_mut() {
                td.new_search();
            }
        }

        let time = TimeManager::new(&limits, self.board.side_to_move());
        let persist = self.persist.lock();
        let shared = Arc::new(SearchShared {
            tt: Arc::clone(&self.tt),
            stop: AtomicBool::new(false),
            ponder: AtomicBool::new(limits.ponder),
            stop_on_ponderhit: AtomicBool::new(false),
            nodes: (0..thread_count).map(|_| AtomicU64::new(0)).collect(),
            start: Instant::now(),
            limits,
            time,
            multipv: self.options.multipv,
            nnue: self.nnue.clone(),
            info: self.info_callback.clone(),
            previous_score: persist.previous_score,
            previous_time_reduction: persist.previous_time_reduction,
        });
        drop(persist);

        let board = self.board.clone();
        let threads = Arc::clone(&self.threads);
        let persist = Arc::clone(&self.persist);
        let shared_for_thread = Arc::clone(&shared);
        let on_bestmove = self.bestmove_callback.clone();

        let handle = thread::Builder::new()
            .name("search-main".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut guard = threads.lock();
                let outcome = threads::run_search(&board, &mut guard, &shared_for_thread);
                drop(guard);
                {
                    let mut p = persist.lock();
                    p.previous_score = outcome.score;
                    p.previous_time_reduction = outcome.time_reduction;
                }
                if let Some(cb) = on_bestmove {
                    cb(outcome.best_move, outcome.ponder_move);
                }
            })
            .expect("failed to spawn search thread");

        self.job = Some(SearchJob { shared, handle });
    }

    /// `stop`: abort and report the best move found so far.
    pub fn stop(&mut self) {
        if let Some(job) = &self.job {
            job.shared.ponder.store(false, Ordering::Relaxed);
            job.shared.stop.store(true, Ordering::Relaxed);
        }
    }

    /// `ponderhit`: the predicted move was played; keep searching on our own
    /// clock, or finish immediately if time already ran out while pondering.
    pub fn ponderhit(&mut self) {
        if let Some(job) = &self.job {
            if job.shared.stop_on_ponderhit.load(Ordering::Relaxed) {
                job.shared.stop.store(true, Ordering::Relaxed);
            }
            job.shared.ponder.store(false, Ordering::Relaxed);
        }
    }

    pub fn wait_for_search_finished(&mut self) {
        if let Some(job) = self.job.take() {
            job.shared.stop.store(true, Ordering::Relaxed);
            let _ = job.handle.join();
        }
    }

    /// Blocks until a running search announces its best move on its own.
    pub fn wait_for_bestmove(&mut self) {
        if let Some(job) = self.job.take() {
            let _ = job.handle.join();
        }
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }

    pub fn perft(&mut self, depth: usize) -> u64 {
        self.board.perft(depth)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.wait_for_search_finished();
    }
}
