//! Per-thread iterative deepening: aspiration windows, MultiPV collation,
//! and the main thread's time management.

use std::sync::atomic::Ordering;

use crate::board::types::{
    Move, Value, MAX_PLY, VALUE_DRAW, VALUE_INFINITE, VALUE_MATE, VALUE_MATE_IN_MAX_PLY,
};

use super::constants::{SKIP_PHASE, SKIP_SIZE};
use super::{sort_root_moves, ScoreBound, SearchInfo, SearchWorker, STACK_OFFSET};

impl SearchWorker<'_> {
    /// The worker's whole search: grow depth one ply at a time until stopped.
    /// Helper threads skip depths according to their skip-block pattern so
    /// the pool spreads over neighboring depths.
    pub(crate) fn iterative_deepening(&mut self) {
        let main = self.is_main();
        let mut best_value = -VALUE_INFINITE;
        let mut last_best_move = Move::NONE;
        let mut last_best_move_depth = 0i32;
        let mut time_reduction = 1.0f64;

        if main {
            self.failed_low = false;
            self.best_move_changes = 0.0;
        }

        let multipv = self.shared.multipv.clamp(1, self.root_moves.len().max(1));

        loop {
            self.root_depth += 1;
            if self.root_depth >= MAX_PLY as i32 || self.shared.stopped() {
                break;
            }
            if main && self.shared.limits.depth.is_some_and(|d| self.root_depth > d) {
                break;
            }

            // Distribute helper threads across iteration depths.
            if self.id > 0 {
                let i = (self.id - 1) % 20;
                if ((self.root_depth + self.board.game_ply() as i32 + SKIP_PHASE[i])
                    / SKIP_SIZE[i])
                    % 2
                    == 1
                {
                    continue;
                }
            }

            if main {
                // Age the PV variability metric.
                self.best_move_changes *= 0.505;
                self.failed_low = false;
            }

            for rm in &mut self.root_moves {
                rm.previous_score = rm.score;
            }

            let mut pv_idx = 0;
            while pv_idx < multipv && !self.shared.stopped() {
                self.pv_idx = pv_idx;
                self.sel_depth = 0;

                // Aspiration window around the previous iteration's score.
                let mut delta = 18;
                let mut alpha = -VALUE_INFINITE;
                let mut beta = VALUE_INFINITE;
                if self.root_depth >= 5 {
                    let prev = self.root_moves[pv_idx].previous_score;
                    alpha = (prev - delta).max(-VALUE_INFINITE);
                    beta = (prev + delta).min(VALUE_INFINITE);
                }

                loop {
                    best_value =
                        self.search(true, STACK_OFFSET, alpha, beta, self.root_depth, false, false);

                    // The stable sort keeps unsearched moves in their old
                    // order while the fresh PV moves to the front.
                    sort_root_moves(&mut self.root_moves[pv_idx..]);

                    if self.shared.stopped() {
                        break;
                    }

                    if main
                        && multipv == 1
                        && (best_value <= alpha || best_value >= beta)
                        && self.shared.elapsed_ms() > 3000
                    {
                        self.report_pv(multipv, alpha, beta);
                    }

                    if best_value <= alpha {
                        beta = (alpha + beta) / 2;
                        alpha = (best_value - delta).max(-VALUE_INFINITE);
                        if main {
                            self.failed_low = true;
                            self.shared
                                .stop_on_ponderhit
                                .store(false, Ordering::Relaxed);
                        }
                    } else if best_value >= beta {
                        beta = (best_value + delta).min(VALUE_INFINITE);
                    } else {
                        break;
                    }

                    delta += delta / 4 + 5;
                }

                sort_root_moves(&mut self.root_moves[..=pv_idx]);
                self.refresh_pv(pv_idx);

                if main
                    && (self.shared.stopped()
                        || pv_idx + 1 == multipv
                        || self.shared.elapsed_ms() > 3000)
                {
                    self.report_pv(multipv, alpha, beta);
                }

                pv_idx += 1;
            }

            if !self.shared.stopped() {
                self.completed_depth = self.root_depth;
                #[cfg(feature = "logging")]
                log::trace!(
                    "thread {} completed depth {} ({} nodes)",
                    self.id,
                    self.completed_depth,
                    self.shared.nodes_searched()
                );
            }

            if self.root_moves[0].mv != last_best_move {
                last_best_move = self.root_moves[0].mv;
                last_best_move_depth = self.root_depth;
            }

            // Mate-in-N request satisfied?
            if let Some(mate) = self.shared.limits.mate {
                if main
                    && best_value >= VALUE_MATE_IN_MAX_PLY
                    && VALUE_MATE - best_value <= 2 * mate
                {
                    self.shared.stop.store(true, Ordering::Relaxed);
                }
            }

            if !main {
                continue;
            }

            // Time management: decide whether the next iteration is worth
            // starting.
            if self.shared.limits.use_time_management()
                && !self.shared.stopped()
                && !self.shared.stop_on_ponderhit.load(Ordering::Relaxed)
            {
                if let Some(tm) = &self.shared.time {
                    let failed_low = i32::from(self.failed_low);
                    let score_drop = best_value - self.shared.previous_score;
                    let improving_factor =
                        (357 + 119 * failed_low - 6 * score_drop).clamp(229, 715);

                    let us = self.board.side_to_move().index();
                    let elapsed = self.shared.elapsed_ms();
                    let our_time = self.shared.limits.time[us].unwrap_or(0);
                    let their_time = self.shared.limits.time[1 - us].unwrap_or(0);
                    let think_hard = best_value == VALUE_DRAW
                        && our_time.saturating_sub(elapsed) > their_time
                        && self.pv_is_draw();

                    let mut unstable_pv_factor =
                        1.0 + self.best_move_changes + f64::from(u8::from(think_hard));

                    // A best move stable over many iterations earns a time
                    // rebate, compounding per satisfied threshold.
                    time_reduction = 1.0;
                    for factor in [3, 4, 5] {
                        if last_best_move_depth * factor < self.completed_depth && !think_hard {
                            time_reduction *= 1.3;
                        }
                    }
                    unstable_pv_factor *=
                        self.shared.previous_time_reduction.powf(0.51) / time_reduction;

                    let budget = tm.optimum_ms() as f64 * unstable_pv_factor
                        * f64::from(improving_factor)
                        / 628.0;
                    if self.root_moves.len() == 1 || elapsed as f64 > budget {
                        // While pondering we may not stop on our own; flag
                        // the intent for the ponderhit handler instead.
                        if self.shared.ponder.load(Ordering::Relaxed) {
                            self.shared
                                .stop_on_ponderhit
                                .store(true, Ordering::Relaxed);
                        } else {
                            self.shared.stop.store(true, Ordering::Relaxed);
                        }
                    }
                }
            }
        }

        if main {
            self.time_reduction = time_reduction;
        }
    }

    /// Rebuilds a root move's principal variation by walking the table from
    /// its first move, stopping on an illegal continuation or a repetition.
    fn refresh_pv(&mut self, pv_idx: usize) {
        let first = self.root_moves[pv_idx].mv;
        if !first.is_some() {
            return;
        }
        let mut pv = Vec::with_capacity(self.root_depth as usize);
        let mut visited = Vec::with_capacity(self.root_depth as usize);
        let mut undo = Vec::new();
        let mut mv = first;

        while pv.len() < MAX_PLY {
            if !self.board.generate_moves().contains(mv) {
                break;
            }
            visited.push(self.board.key());
            pv.push(mv);
            undo.push((mv, self.board.make_move(mv)));
            if visited.contains(&self.board.key()) {
                break;
            }
            match self.shared.tt.probe(self.board.key(), 0) {
                Some(t) if t.mv.is_some() => mv = t.mv,
                _ => break,
            }
        }

        for (m, info) in undo.into_iter().rev() {
            self.board.unmake_move(m, info);
        }
        self.root_moves[pv_idx].pv = pv;
    }

    /// Does the current principal variation end in a draw?
    fn pv_is_draw(&mut self) -> bool {
        let pv = self.root_moves[0].pv.clone();
        let mut undo = Vec::with_capacity(pv.len());
        for &mv in &pv {
            undo.push((mv, self.board.make_move(mv)));
        }
        let draw = self.board.is_draw(pv.len());
        for (mv, info) in undo.into_iter().rev() {
            self.board.unmake_move(mv, info);
        }
        draw
    }

    /// Pushes the current lines to the UCI layer. Lines not refreshed this
    /// iteration are reported with their previous depth and score.
    pub(crate) fn report_pv(&self, multipv: usize, alpha: Value, beta: Value) {
        let Some(callback) = &self.shared.info else {
            return;
        };
        let elapsed = self.shared.elapsed_ms().max(1);
        let nodes = self.shared.nodes_searched();

        for (i, rm) in self.root_moves.iter().take(multipv).enumerate() {
            let updated = i <= self.pv_idx && rm.score != -VALUE_INFINITE;
            if self.root_depth == 1 && !updated {
                continue;
            }
            let (depth, score) = if updated {
                (self.root_depth, rm.score)
            } else {
                (self.root_depth - 1, rm.previous_score)
            };
            let bound = if i == self.pv_idx {
                if score >= beta {
                    ScoreBound::Lower
                } else if score <= alpha {
                    ScoreBound::Upper
                } else {
                    ScoreBound::Exact
                }
            } else {
                ScoreBound::Exact
            };
            callback(&SearchInfo {
                depth,
                sel_depth: rm.sel_depth,
                multipv: i + 1,
                score,
                bound,
                nodes,
                nps: nodes * 1000 / elapsed,
                time_ms: elapsed,
                hashfull: if elapsed > 1000 {
                    self.shared.tt.hashfull()
                } else {
                    0
                },
                pv: rm.pv.clone(),
            });
        }
    }
}
