//! The recursive alpha-beta search.
//!
//! One function serves PV and non-PV nodes; `pv_node` selects the window
//! discipline and `cut_node` biases the late-move reductions. The step
//! numbering follows the classic layout: TT cutoff, static evaluation,
//! razoring, reverse futility, null move with verification, ProbCut,
//! internal iterative deepening, then the move loop with singular and check
//! extensions, shallow-depth pruning, and late-move reductions.

use crate::board::types::{
    colored_piece_index, mate_in, mated_in, Move, MoveType, Piece, Value, MAX_PLY, PAWN_EG,
    PAWN_MG, TEMPO, VALUE_DRAW, VALUE_INFINITE, VALUE_KNOWN_WIN, VALUE_MATE,
    VALUE_MATED_IN_MAX_PLY, VALUE_MATE_IN_MAX_PLY, VALUE_NONE,
};
use crate::tt::{Bound, DEPTH_NONE};

use super::constants::{
    futility_margin, futility_move_count, reduction, stat_bonus, COUNTER_MOVE_PRUNE_THRESHOLD,
    RAZOR_MARGIN,
};
use super::history::CONT_HISTORY_SENTINEL;
use super::movepick::{HistoryView, MovePicker};
use super::{SearchWorker, StackFrame, ThreadData, STACK_OFFSET};

/// History view for the move picker, resolved from the stack frames at plies
/// -1, -2, and -4. A free function so the caller can keep a live `&mut` to
/// the board while the view borrows only the thread tables.
pub(crate) fn history_view<'t>(
    td: &'t ThreadData,
    stack: &[StackFrame],
    ss: usize,
) -> HistoryView<'t> {
    HistoryView {
        main: &td.main_history,
        capture: &td.capture_history,
        cont: [
            td.cont_history.table(stack[ss - 1].cont_hist),
            td.cont_history.table(stack[ss - 2].cont_hist),
            td.cont_history.table(stack[ss - 4].cont_hist),
        ],
    }
}

impl SearchWorker<'_> {
    #[inline]
    pub(crate) fn frame(&self, ss: usize) -> StackFrame {
        self.stack[ss]
    }

    #[inline]
    pub(crate) fn frame_mut(&mut self, ss: usize) -> &mut StackFrame {
        &mut self.stack[ss]
    }

    /// Colored piece index of whatever stands on `sq`, or the sentinel.
    fn piece_index_on(&self, sq: Move) -> usize {
        match self.board.piece_at(sq.to()) {
            Some((c, p)) => colored_piece_index(c, p),
            None => CONT_HISTORY_SENTINEL.0,
        }
    }

    pub(crate) fn search(
        &mut self,
        pv_node: bool,
        ss: usize,
        mut alpha: Value,
        mut beta: Value,
        depth: i32,
        cut_node: bool,
        skip_early_pruning: bool,
    ) -> Value {
        debug_assert!(-VALUE_INFINITE <= alpha && alpha < beta && beta <= VALUE_INFINITE);
        debug_assert!(pv_node || alpha == beta - 1);

        if depth < 1 {
            return self.qsearch(pv_node, ss, alpha, beta, 0);
        }

        let ply = ss - STACK_OFFSET;
        let root_node = pv_node && ply == 0;
        let us = self.board.side_to_move();
        let in_check = self.board.checkers().any();

        // Step 1: node init.
        self.count_node();
        self.frame_mut(ss).move_count = 0;
        self.frame_mut(ss).stat_score = 0;
        let mut best_value = -VALUE_INFINITE;
        let mut best_move = Move::NONE;

        if pv_node && self.sel_depth < ply as i32 + 1 {
            self.sel_depth = ply as i32 + 1;
        }

        if !root_node {
            // Step 2: aborted search and immediate draws.
            if self.shared.stopped() || self.board.is_draw(ply) || ply >= MAX_PLY {
                return if ply >= MAX_PLY && !in_check {
                    self.evaluate()
                } else {
                    VALUE_DRAW
                };
            }

            // Step 3: mate distance pruning.
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(mate_in(ply + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        self.frame_mut(ss).current_move = Move::NONE;
        self.frame_mut(ss).captured = None;
        self.frame_mut(ss).cont_hist = CONT_HISTORY_SENTINEL;
        self.frame_mut(ss + 1).excluded_move = Move::NONE;
        self.frame_mut(ss + 2).killers = [Move::NONE; 2];
        let prev_move = self.frame(ss - 1).current_move;
        let prev_sq = prev_move.to();

        // Step 4: transposition table lookup. Exclusion searches salt the key
        // so their partial results never shadow the full ones.
        let excluded = self.frame(ss).excluded_move;
        let pos_key = self.board.key() ^ (u64::from(excluded.bits()) << 16);
        let tte = self.shared.tt.probe(pos_key, ply);
        let tt_value = tte.map_or(VALUE_NONE, |t| t.value);
        let mut tt_move = if root_node {
            self.root_moves[self.pv_idx].mv
        } else {
            tte.map_or(Move::NONE, |t| t.mv)
        };
        let tt_bound = tte.map_or(Bound::None, |t| t.bound);
        let tt_depth = tte.map_or(DEPTH_NONE, |t| t.depth);

        if !pv_node
            && tte.is_some()
            && tt_depth >= depth
            && tt_value != VALUE_NONE
            && if tt_value >= beta {
                tt_bound.includes_lower()
            } else {
                tt_bound.includes_upper()
            }
        {
            // Refresh move ordering from the confirmed or refuted TT move.
            if tt_move.is_some() {
                if tt_value >= beta {
                    if !self.board.is_capture_or_promotion(tt_move) {
                        self.update_stats(ss, tt_move, &[], stat_bonus(depth));
                    }
                    if self.frame(ss - 1).move_count == 1
                        && self.frame(ss - 1).captured.is_none()
                        && prev_move.is_some()
                    {
                        let prev_piece = self.piece_index_on(prev_move);
                        self.update_continuation_histories(
                            ss - 1,
                            prev_piece,
                            prev_sq,
                            -stat_bonus(depth + 1),
                        );
                    }
                } else if !self.board.is_capture_or_promotion(tt_move) {
                    let penalty = -stat_bonus(depth);
                    self.td.main_history.update(us, tt_move, penalty);
                    if let Some(piece) = self.board.moved_piece(tt_move) {
                        self.update_continuation_histories(
                            ss,
                            colored_piece_index(us, piece),
                            tt_move.to(),
                            penalty,
                        );
                    }
                }
            }
            return tt_value;
        }

        // Step 5: static evaluation. In check there is none, and every
        // eval-guided pruning idea below is skipped with it.
        if in_check {
            self.frame_mut(ss).static_eval = VALUE_NONE;
        } else {
            let mut eval;
            if let Some(t) = tte {
                let stored = t.eval;
                eval = if stored == VALUE_NONE {
                    self.evaluate()
                } else {
                    stored
                };
                self.frame_mut(ss).static_eval = eval;
                // The search result bounds the true value tighter than the
                // static eval does.
                if tt_value != VALUE_NONE
                    && if tt_value > eval {
                        tt_bound.includes_lower()
                    } else {
                        tt_bound.includes_upper()
                    }
                {
                    eval = tt_value;
                }
            } else {
                eval = if prev_move != Move::NULL {
                    self.evaluate()
                } else {
                    -self.frame(ss - 1).static_eval + 2 * TEMPO
                };
                self.frame_mut(ss).static_eval = eval;
                self.shared.tt.store(
                    pos_key,
                    VALUE_NONE,
                    Bound::None,
                    DEPTH_NONE,
                    Move::NONE,
                    eval,
                    ply,
                );
            }

            let static_eval = self.frame(ss).static_eval;
            if !skip_early_pruning && self.board.non_pawn_material(us) > 0 {
                // Step 6: razoring.
                if !pv_node && depth < 4 && eval + RAZOR_MARGIN <= alpha {
                    if depth <= 1 {
                        return self.qsearch(false, ss, alpha, alpha + 1, 0);
                    }
                    let ralpha = alpha - RAZOR_MARGIN;
                    let v = self.qsearch(false, ss, ralpha, ralpha + 1, 0);
                    if v <= ralpha {
                        return v;
                    }
                }

                // Step 7: reverse futility. Unproven wins are not returned.
                if !root_node
                    && depth < 7
                    && eval - futility_margin(depth) >= beta
                    && eval < VALUE_KNOWN_WIN
                {
                    return eval;
                }

                // Step 8: null move with verification, guarded so the same
                // side cannot null twice in a row in the verified subtree.
                if !pv_node
                    && eval >= beta
                    && static_eval >= beta - 36 * depth + 225
                    && (ply as i32 >= self.nmp_ply || ply as i32 % 2 != self.nmp_odd)
                {
                    let r = (823 + 67 * depth) / 256 + ((eval - beta) / PAWN_MG).min(3);

                    self.frame_mut(ss).current_move = Move::NULL;
                    self.frame_mut(ss).captured = None;
                    self.frame_mut(ss).cont_hist = CONT_HISTORY_SENTINEL;

                    let null_info = self.board.make_null_move();
                    let mut null_value = if depth - r < 1 {
                        -self.qsearch(false, ss + 1, -beta, -beta + 1, 0)
                    } else {
                        -self.search(false, ss + 1, -beta, -beta + 1, depth - r, !cut_node, true)
                    };
                    self.board.unmake_null_move(null_info);

                    if null_value >= beta {
                        if null_value >= VALUE_MATE_IN_MAX_PLY {
                            null_value = beta;
                        }
                        if beta.abs() < VALUE_KNOWN_WIN && (depth < 12 || self.nmp_ply != 0) {
                            return null_value;
                        }
                        // Verification search with null moves banned for us.
                        self.nmp_ply = ply as i32 + 3 * (depth - r) / 4;
                        self.nmp_odd = ply as i32 % 2;
                        let v = if depth - r < 1 {
                            self.qsearch(false, ss, beta - 1, beta, 0)
                        } else {
                            self.search(false, ss, beta - 1, beta, depth - r, false, true)
                        };
                        self.nmp_ply = 0;
                        self.nmp_odd = 0;
                        if v >= beta {
                            return null_value;
                        }
                    }
                }

                // Step 9: ProbCut. A capture that clears a raised beta at
                // reduced depth almost always clears beta at full depth.
                if !pv_node && depth >= 5 && beta.abs() < VALUE_MATE_IN_MAX_PLY {
                    let rbeta = (beta + 200).min(VALUE_INFINITE);
                    let mut mp =
                        MovePicker::new_probcut(&self.board, tt_move, rbeta - static_eval);
                    loop {
                        let mv = {
                            let view = history_view(self.td, &self.stack, ss);
                            mp.next(&mut self.board, &view, false)
                        };
                        let Some(mv) = mv else { break };
                        let captured = self.board.captured_piece(mv);
                        let piece = self.board.moved_piece(mv).unwrap_or(Piece::Pawn);
                        let info = self.board.make_move(mv);
                        if self.board.in_check(us) {
                            self.board.unmake_move(mv, info);
                            continue;
                        }
                        self.frame_mut(ss).current_move = mv;
                        self.frame_mut(ss).captured = captured;
                        self.frame_mut(ss).cont_hist =
                            (colored_piece_index(us, piece), mv.to().index());
                        let value = -self.search(
                            false,
                            ss + 1,
                            -rbeta,
                            -rbeta + 1,
                            depth - 4,
                            !cut_node,
                            false,
                        );
                        self.board.unmake_move(mv, info);
                        if value >= rbeta {
                            return value;
                        }
                    }
                }

                // Step 10: internal iterative deepening.
                if depth >= 6 && !tt_move.is_some() && (pv_node || static_eval + 256 >= beta) {
                    let d = 3 * depth / 4 - 2;
                    self.search(pv_node, ss, alpha, beta, d, cut_node, true);
                    if let Some(t) = self.shared.tt.probe(pos_key, ply) {
                        tt_move = t.mv;
                    }
                }
            }
        }

        // Step 11: the move loop.
        let improving = {
            let two_back = self.frame(ss - 2).static_eval;
            self.frame(ss).static_eval >= two_back || two_back == VALUE_NONE
        };

        let countermove = if prev_move.is_some() {
            self.td
                .counter_moves
                .get(self.piece_index_on(prev_move), prev_sq)
        } else {
            Move::NONE
        };

        let singular_node = !root_node
            && depth >= 8
            && tt_move.is_some()
            && tt_value != VALUE_NONE
            && !excluded.is_some()
            && tt_bound.includes_lower()
            && tt_depth >= depth - 3;

        let mut mp = MovePicker::new_main(
            &self.board,
            tt_move,
            depth,
            self.frame(ss).killers,
            countermove,
        );

        let mut move_count = 0;
        let mut skip_quiets = false;
        let mut tt_capture = false;
        let pv_exact = pv_node && tte.is_some() && tt_bound == Bound::Exact;
        let us_has_pieces = self.board.non_pawn_material(us) > 0;

        let mut quiets_searched: Vec<Move> = Vec::with_capacity(64);
        let mut captures_searched: Vec<Move> = Vec::with_capacity(32);

        loop {
            let mv = {
                let view = history_view(self.td, &self.stack, ss);
                mp.next(&mut self.board, &view, skip_quiets)
            };
            let Some(mv) = mv else { break };

            if mv == excluded {
                continue;
            }
            // At the root only the moves of the current MultiPV slice are
            // searched; earlier PV lines are done, and `searchmoves` has
            // already filtered the list.
            if root_node && !self.root_moves[self.pv_idx..].iter().any(|rm| rm.mv == mv) {
                continue;
            }

            move_count += 1;
            self.frame_mut(ss).move_count = move_count;

            let capture_or_promotion = self.board.is_capture_or_promotion(mv);
            let captured = self.board.captured_piece(mv);
            let moved_piece = self.board.moved_piece(mv).unwrap_or(Piece::Pawn);
            let moved_index = colored_piece_index(us, moved_piece);
            let advanced_push = self.board.advanced_pawn_push(mv);
            let (legal, gives_check) = self.board.probe_move(mv);

            if !root_node && !legal {
                move_count -= 1;
                self.frame_mut(ss).move_count = move_count;
                continue;
            }

            let move_count_pruning =
                depth < 16 && move_count >= futility_move_count(improving, depth);

            // Step 12: singular and check extensions.
            let mut extension = 0;
            if singular_node && mv == tt_move {
                let rbeta = (tt_value - 2 * depth).max(-VALUE_MATE);
                let d = depth / 2;
                self.frame_mut(ss).excluded_move = mv;
                let value = self.search(false, ss, rbeta - 1, rbeta, d, cut_node, true);
                self.frame_mut(ss).excluded_move = Move::NONE;
                if value < rbeta {
                    extension = 1;
                }
            } else if gives_check && !move_count_pruning && self.board.see_ge(mv, 0) {
                extension = 1;
            }

            let new_depth = depth - 1 + extension;

            // Step 13: pruning at shallow depth.
            if !root_node && us_has_pieces && best_value > VALUE_MATED_IN_MAX_PLY {
                if !capture_or_promotion
                    && !gives_check
                    && (!advanced_push || self.board.total_non_pawn_material() >= 5000)
                {
                    if move_count_pruning {
                        skip_quiets = true;
                        continue;
                    }

                    let lmr_depth =
                        (new_depth - reduction(pv_node, improving, depth, move_count)).max(0);

                    // Quiets with a hopeless continuation history go first.
                    let ch0 = self.td.cont_history.table(self.frame(ss - 1).cont_hist);
                    let ch1 = self.td.cont_history.table(self.frame(ss - 2).cont_hist);
                    if lmr_depth < 3
                        && ch0.get(moved_index, mv.to()) < COUNTER_MOVE_PRUNE_THRESHOLD
                        && ch1.get(moved_index, mv.to()) < COUNTER_MOVE_PRUNE_THRESHOLD
                    {
                        continue;
                    }

                    if lmr_depth < 7
                        && !in_check
                        && self.frame(ss).static_eval + 256 + 200 * lmr_depth <= alpha
                    {
                        continue;
                    }

                    if lmr_depth < 8 && !self.board.see_ge(mv, -35 * lmr_depth * lmr_depth) {
                        continue;
                    }
                } else if depth < 7
                    && extension == 0
                    && !self.board.see_ge(mv, -PAWN_EG * depth)
                {
                    continue;
                }
            }

            if mv == tt_move && capture_or_promotion {
                tt_capture = true;
            }

            // Step 14: make the move.
            self.frame_mut(ss).current_move = mv;
            self.frame_mut(ss).captured = captured;
            self.frame_mut(ss).cont_hist = (moved_index, mv.to().index());
            let info = self.board.make_move(mv);

            // Step 15: late-move reductions.
            let mut value;
            let do_full_depth_search;
            if depth >= 3 && move_count > 1 && (!capture_or_promotion || move_count_pruning) {
                let mut r = reduction(pv_node, improving, depth, move_count);

                if capture_or_promotion {
                    r = (r - 1).max(0);
                } else {
                    if self.frame(ss - 1).move_count > 15 {
                        r -= 1;
                    }
                    if pv_exact {
                        r -= 1;
                    }
                    if tt_capture {
                        r += 1;
                    }
                    if cut_node {
                        r += 2;
                    } else if mv.move_type() == MoveType::Normal
                        && !self.board.see_ge(Move::new(mv.to(), mv.from()), 0)
                    {
                        // The move escaped a capture; reduce less.
                        r -= 2;
                    }

                    let ch0 = self.td.cont_history.table(self.frame(ss - 1).cont_hist);
                    let ch1 = self.td.cont_history.table(self.frame(ss - 2).cont_hist);
                    let ch3 = self.td.cont_history.table(self.frame(ss - 4).cont_hist);
                    let stat_score = self.td.main_history.get(us, mv)
                        + ch0.get(moved_index, mv.to())
                        + ch1.get(moved_index, mv.to())
                        + ch3.get(moved_index, mv.to())
                        - 4000;
                    self.frame_mut(ss).stat_score = stat_score;

                    if stat_score >= 0 && self.frame(ss - 1).stat_score < 0 {
                        r -= 1;
                    } else if self.frame(ss - 1).stat_score >= 0 && stat_score < 0 {
                        r += 1;
                    }

                    r = (r - stat_score / 20000).max(0);
                }

                let d = (new_depth - r).max(1);
                value = -self.search(false, ss + 1, -(alpha + 1), -alpha, d, true, false);
                do_full_depth_search = value > alpha && d != new_depth;
            } else {
                value = 0;
                do_full_depth_search = !pv_node || move_count > 1;
            }

            // Step 16: full-depth null-window search.
            if do_full_depth_search {
                value = if new_depth < 1 {
                    -self.qsearch(false, ss + 1, -(alpha + 1), -alpha, 0)
                } else {
                    -self.search(false, ss + 1, -(alpha + 1), -alpha, new_depth, !cut_node, false)
                };
            }

            // Full-window search for the PV.
            if pv_node && (move_count == 1 || (value > alpha && (root_node || value < beta))) {
                value = if new_depth < 1 {
                    -self.qsearch(true, ss + 1, -beta, -alpha, 0)
                } else {
                    -self.search(true, ss + 1, -beta, -alpha, new_depth, false, false)
                };
            }

            // Step 17: undo.
            self.board.unmake_move(mv, info);

            // Step 18: a stopped search's value is garbage; drop it before it
            // can reach the TT or the root-move list.
            if self.shared.stopped() {
                return VALUE_DRAW;
            }

            if root_node {
                if let Some(rm) = self.root_moves.iter_mut().find(|rm| rm.mv == mv) {
                    if move_count == 1 || value > alpha {
                        rm.score = value;
                        rm.sel_depth = self.sel_depth;
                        if move_count > 1 && self.id == 0 {
                            self.best_move_changes += 1.0;
                        }
                    } else {
                        // Preserve sort order: unsearched and refuted moves
                        // keep their previous rank.
                        rm.score = -VALUE_INFINITE;
                    }
                }
            }

            if value > best_value {
                best_value = value;
                if value > alpha {
                    best_move = mv;
                    if pv_node && value < beta {
                        alpha = value;
                    } else {
                        break; // fail high
                    }
                }
            }

            if mv != best_move {
                if capture_or_promotion && captures_searched.len() < 32 {
                    captures_searched.push(mv);
                } else if !capture_or_promotion && quiets_searched.len() < 64 {
                    quiets_searched.push(mv);
                }
            }
        }

        // Step 20: mate and stalemate.
        if move_count == 0 {
            best_value = if excluded.is_some() {
                alpha
            } else if in_check {
                mated_in(ply)
            } else {
                VALUE_DRAW
            };
        } else if best_move.is_some() {
            if !self.board.is_capture_or_promotion(best_move) {
                self.update_stats(ss, best_move, &quiets_searched, stat_bonus(depth));
            } else {
                self.update_capture_stats(best_move, &captures_searched, stat_bonus(depth));
            }
            // The previous quiet move led straight into this refutation.
            if self.frame(ss - 1).move_count == 1
                && self.frame(ss - 1).captured.is_none()
                && prev_move.is_some()
            {
                let prev_piece = self.piece_index_on(prev_move);
                self.update_continuation_histories(
                    ss - 1,
                    prev_piece,
                    prev_sq,
                    -stat_bonus(depth + 1),
                );
            }
        } else if depth >= 3
            && self.frame(ss - 1).captured.is_none()
            && prev_move.is_some()
        {
            // No move beat alpha: credit the opponent's previous move.
            let prev_piece = self.piece_index_on(prev_move);
            self.update_continuation_histories(ss - 1, prev_piece, prev_sq, stat_bonus(depth));
        }

        if !excluded.is_some() {
            let bound = if best_value >= beta {
                Bound::Lower
            } else if pv_node && best_move.is_some() {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.shared.tt.store(
                pos_key,
                best_value,
                bound,
                depth,
                best_move,
                self.frame(ss).static_eval,
                ply,
            );
        }

        debug_assert!(best_value > -VALUE_INFINITE && best_value < VALUE_INFINITE);
        best_value
    }

    /// Bumps the continuation histories of the moves 1, 2, and 4 plies back
    /// for the (piece, to) pair of the move being rewarded or punished.
    pub(crate) fn update_continuation_histories(
        &mut self,
        ss: usize,
        piece_index: usize,
        to: crate::board::types::Square,
        bonus: i32,
    ) {
        for back in [1usize, 2, 4] {
            if ss >= back {
                let frame = self.frame(ss - back);
                if frame.current_move.is_some() {
                    self.td
                        .cont_history
                        .table_mut(frame.cont_hist)
                        .update(piece_index, to, bonus);
                }
            }
        }
    }

    /// Rewards a quiet move that produced a cutoff: killers, counter move,
    /// butterfly and continuation histories; co-searched quiets are docked.
    pub(crate) fn update_stats(&mut self, ss: usize, mv: Move, quiets: &[Move], bonus: i32) {
        let us = self.board.side_to_move();
        let killers = &mut self.frame_mut(ss).killers;
        if killers[0] != mv {
            killers[1] = killers[0];
            killers[0] = mv;
        }

        self.td.main_history.update(us, mv, bonus);
        if let Some(piece) = self.board.moved_piece(mv) {
            let idx = colored_piece_index(us, piece);
            self.update_continuation_histories(ss, idx, mv.to(), bonus);
        }

        let prev_move = self.frame(ss - 1).current_move;
        if prev_move.is_some() {
            let prev_piece = self.piece_index_on(prev_move);
            self.td.counter_moves.set(prev_piece, prev_move.to(), mv);
        }

        for &quiet in quiets {
            self.td.main_history.update(us, quiet, -bonus);
            if let Some(piece) = self.board.moved_piece(quiet) {
                let idx = colored_piece_index(us, piece);
                self.update_continuation_histories(ss, idx, quiet.to(), -bonus);
            }
        }
    }

    /// Same idea for a capture that became the best move.
    pub(crate) fn update_capture_stats(&mut self, mv: Move, captures: &[Move], bonus: i32) {
        let us = self.board.side_to_move();
        if let (Some(piece), Some(victim)) =
            (self.board.moved_piece(mv), self.board.captured_piece(mv))
        {
            self.td
                .capture_history
                .update(us, piece, mv.to(), victim, bonus);
        }
        for &capture in captures {
            if let (Some(piece), Some(victim)) = (
                self.board.moved_piece(capture),
                self.board.captured_piece(capture),
            ) {
                self.td
                    .capture_history
                    .update(us, piece, capture.to(), victim, -bonus);
            }
        }
    }
}
