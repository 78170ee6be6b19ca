//! Staged move picker.
//!
//! Moves are produced lazily: the table move first, then winning captures,
//! killers and the counter move, history-ordered quiets, and finally the
//! losing captures. Generation and scoring of a class only happens if the
//! search actually asks for it, which it frequently does not after an early
//! cutoff. Ties keep insertion order.

use crate::board::movegen::GenKind;
use crate::board::types::{
    colored_piece_index, piece_value_mg, Move, Piece, Value, MAX_MOVES,
};
use crate::board::Board;

use super::history::{ButterflyHistory, CaptureHistory, PieceToHistory};

/// Read-only slice of the thread's history tables used for scoring.
pub(crate) struct HistoryView<'a> {
    pub main: &'a ButterflyHistory,
    pub capture: &'a CaptureHistory,
    /// Continuation histories for the moves 1, 2, and 4 plies back.
    pub cont: [&'a PieceToHistory; 3],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    MainTT,
    CaptureInit,
    GoodCaptures,
    Killer0,
    Killer1,
    Countermove,
    QuietInit,
    Quiets,
    BadCaptures,
    EvasionTT,
    EvasionInit,
    Evasions,
    QsearchTT,
    QCaptureInit,
    QCaptures,
    QCheckInit,
    QChecks,
    ProbcutTT,
    ProbcutInit,
    ProbcutCaptures,
    Done,
}

/// Fixed-capacity scored list. Picking always takes the earliest entry with
/// the highest score, so equal scores come out in insertion order.
struct ScoredMoves {
    moves: [(Move, i32); MAX_MOVES],
    len: usize,
    remaining: usize,
}

impl ScoredMoves {
    const fn new() -> Self {
        ScoredMoves {
            moves: [(Move::NONE, 0); MAX_MOVES],
            len: 0,
            remaining: 0,
        }
    }

    fn push(&mut self, mv: Move, score: i32) {
        self.moves[self.len] = (mv, score);
        self.len += 1;
        self.remaining += 1;
    }

    fn pick_best(&mut self) -> Option<(Move, i32)> {
        if self.remaining == 0 {
            return None;
        }
        let mut best = usize::MAX;
        for i in 0..self.len {
            if self.moves[i].0.is_some() && (best == usize::MAX || self.moves[i].1 > self.moves[best].1)
            {
                best = i;
            }
        }
        if best == usize::MAX {
            return None;
        }
        let i = best;
        let entry = self.moves[i];
        self.moves[i].0 = Move::NONE;
        self.remaining -= 1;
        Some(entry)
    }
}

pub(crate) struct MovePicker {
    stage: Stage,
    tt_move: Move,
    killers: [Move; 2],
    countermove: Move,
    depth: i32,
    threshold: Value,
    list: ScoredMoves,
    bad_captures: ScoredMoves,
}

impl MovePicker {
    /// Picker for the main search.
    pub fn new_main(
        board: &Board,
        tt_move: Move,
        depth: i32,
        killers: [Move; 2],
        countermove: Move,
    ) -> Self {
        let in_check = board.checkers().any();
        let tt_ok = tt_move.is_some() && board.is_pseudo_legal(tt_move);
        MovePicker {
            stage: if in_check { Stage::EvasionTT } else { Stage::MainTT },
            tt_move: if tt_ok { tt_move } else { Move::NONE },
            killers,
            countermove,
            depth,
            threshold: 0,
            list: ScoredMoves::new(),
            bad_captures: ScoredMoves::new(),
        }
    }

    /// Picker for quiescence: captures, plus quiet checks right at the
    /// horizon (`depth == 0`).
    pub fn new_qsearch(board: &Board, tt_move: Move, depth: i32) -> Self {
        let in_check = board.checkers().any();
        let tt_ok = tt_move.is_some() && board.is_pseudo_legal(tt_move);
        MovePicker {
            stage: if in_check {
                Stage::EvasionTT
            } else {
                Stage::QsearchTT
            },
            tt_move: if tt_ok { tt_move } else { Move::NONE },
            killers: [Move::NONE; 2],
            countermove: Move::NONE,
            depth,
            threshold: 0,
            list: ScoredMoves::new(),
            bad_captures: ScoredMoves::new(),
        }
    }

    /// Picker for ProbCut: only captures whose exchange clears `threshold`.
    pub fn new_probcut(board: &Board, tt_move: Move, threshold: Value) -> Self {
        let tt_ok = tt_move.is_some()
            && board.is_pseudo_legal(tt_move)
            && board.is_capture(tt_move)
            && board.see_ge(tt_move, threshold);
        MovePicker {
            stage: Stage::ProbcutTT,
            tt_move: if tt_ok { tt_move } else { Move::NONE },
            killers: [Move::NONE; 2],
            countermove: Move::NONE,
            depth: 0,
            threshold,
            list: ScoredMoves::new(),
            bad_captures: ScoredMoves::new(),
        }
    }

    fn capture_score(&self, board: &Board, hist: &HistoryView, mv: Move) -> i32 {
        let color = board.side_to_move();
        let victim = board.captured_piece(mv).unwrap_or(Piece::Pawn);
        let moved = board.moved_piece(mv).unwrap_or(Piece::Pawn);
        let base = if board.is_capture(mv) {
            piece_value_mg(victim)
        } else {
            0 // bare promotion
        };
        base + hist.capture.get(color, moved, mv.to(), victim)
    }

    fn quiet_score(&self, board: &Board, hist: &HistoryView, mv: Move) -> i32 {
        let color = board.side_to_move();
        let moved = board.moved_piece(mv).unwrap_or(Piece::Pawn);
        let pc = colored_piece_index(color, moved);
        hist.main.get(color, mv)
            + hist.cont[0].get(pc, mv.to())
            + hist.cont[1].get(pc, mv.to())
            + hist.cont[2].get(pc, mv.to())
    }

    fn is_ordering_special(&self, mv: Move) -> bool {
        mv == self.tt_move
            || mv == self.killers[0]
            || mv == self.killers[1]
            || mv == self.countermove
    }

    /// Next candidate move, pseudo-legal; the caller verifies legality when
    /// it makes the move. Once `skip_quiets` is set, remaining quiet classes
    /// are silently dropped.
    pub fn next(&mut self, board: &mut Board, hist: &HistoryView, skip_quiets: bool) -> Option<Move> {
        loop {
            match self.stage {
                Stage::MainTT => {
                    self.stage = Stage::CaptureInit;
                    if self.tt_move.is_some() {
                        return Some(self.tt_move);
                    }
                }
                Stage::CaptureInit => {
                    let captures = board.generate_pseudo(GenKind::Captures);
                    for &mv in &captures {
                        if mv != self.tt_move {
                            let score = self.capture_score(board, hist, mv);
                            self.list.push(mv, score);
                        }
                    }
                    self.stage = Stage::GoodCaptures;
                }
                Stage::GoodCaptures => match self.list.pick_best() {
                    Some((mv, score)) => {
                        if board.see_ge(mv, 0) {
                            return Some(mv);
                        }
                        self.bad_captures.push(mv, score);
                    }
                    None => self.stage = Stage::Killer0,
                },
                Stage::Killer0 | Stage::Killer1 => {
                    let killer = self.killers[usize::from(self.stage == Stage::Killer1)];
                    self.stage = if self.stage == Stage::Killer0 {
                        Stage::Killer1
                    } else {
                        Stage::Countermove
                    };
                    if killer.is_some()
                        && killer != self.tt_move
                        && board.is_pseudo_legal(killer)
                        && !board.is_capture_or_promotion(killer)
                    {
                        return Some(killer);
                    }
                }
                Stage::Countermove => {
                    self.stage = Stage::QuietInit;
                    let cm = self.countermove;
                    if cm.is_some()
                        && cm != self.tt_move
                        && cm != self.killers[0]
                        && cm != self.killers[1]
                        && board.is_pseudo_legal(cm)
                        && !board.is_capture_or_promotion(cm)
                    {
                        return Some(cm);
                    }
                }
                Stage::QuietInit => {
                    if !skip_quiets {
                        let quiets = board.generate_pseudo(GenKind::Quiets);
                        for &mv in &quiets {
                            if !self.is_ordering_special(mv) {
                                let score = self.quiet_score(board, hist, mv);
                                self.list.push(mv, score);
                            }
                        }
                    }
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if !skip_quiets {
                        if let Some((mv, _)) = self.list.pick_best() {
                            return Some(mv);
                        }
                    }
                    self.stage = Stage::BadCaptures;
                }
                Stage::BadCaptures => match self.bad_captures.pick_best() {
                    Some((mv, _)) => return Some(mv),
                    None => self.stage = Stage::Done,
                },
                Stage::EvasionTT => {
                    self.stage = Stage::EvasionInit;
                    if self.tt_move.is_some() {
                        return Some(self.tt_move);
                    }
                }
                Stage::EvasionInit => {
                    let moves = board.generate_pseudo(GenKind::All);
                    for &mv in &moves {
                        if mv == self.tt_move {
                            continue;
                        }
                        let score = if board.is_capture(mv) {
                            let victim = board.captured_piece(mv).unwrap_or(Piece::Pawn);
                            let moved = board.moved_piece(mv).unwrap_or(Piece::Pawn);
                            (1 << 20) + piece_value_mg(victim) - moved.index() as i32
                        } else {
                            self.quiet_score(board, hist, mv)
                        };
                        self.list.push(mv, score);
                    }
                    self.stage = Stage::Evasions;
                }
                Stage::Evasions => match self.list.pick_best() {
                    Some((mv, _)) => return Some(mv),
                    None => self.stage = Stage::Done,
                },
                Stage::QsearchTT => {
                    self.stage = Stage::QCaptureInit;
                    if self.tt_move.is_some() {
                        return Some(self.tt_move);
                    }
                }
                Stage::QCaptureInit => {
                    let captures = board.generate_pseudo(GenKind::Captures);
                    for &mv in &captures {
                        if mv != self.tt_move {
                            let score = self.capture_score(board, hist, mv);
                            self.list.push(mv, score);
                        }
                    }
                    self.stage = Stage::QCaptures;
                }
                Stage::QCaptures => match self.list.pick_best() {
                    Some((mv, _)) => return Some(mv),
                    None => {
                        if self.depth == 0 {
                            self.stage = Stage::QCheckInit;
                        } else {
                            self.stage = Stage::Done;
                        }
                    }
                },
                Stage::QCheckInit => {
                    let quiets = board.generate_pseudo(GenKind::Quiets);
                    for &mv in &quiets {
                        if mv != self.tt_move && board.gives_check(mv) {
                            self.list.push(mv, 0);
                        }
                    }
                    self.stage = Stage::QChecks;
                }
                Stage::QChecks => match self.list.pick_best() {
                    Some((mv, _)) => return Some(mv),
                    None => self.stage = Stage::Done,
                },
                Stage::ProbcutTT => {
                    self.stage = Stage::ProbcutInit;
                    if self.tt_move.is_some() {
                        return Some(self.tt_move);
                    }
                }
                Stage::ProbcutInit => {
                    let captures = board.generate_pseudo(GenKind::Captures);
                    for &mv in &captures {
                        if mv != self.tt_move && board.is_capture(mv) {
                            let score = self.capture_score(board, hist, mv);
                            self.list.push(mv, score);
                        }
                    }
                    self.stage = Stage::ProbcutCaptures;
                }
                Stage::ProbcutCaptures => match self.list.pick_best() {
                    Some((mv, _)) => {
                        if board.see_ge(mv, self.threshold) {
                            return Some(mv);
                        }
                    }
                    None => self.stage = Stage::Done,
                },
                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::search::history::{CaptureHistory, ContinuationHistory, CONT_HISTORY_SENTINEL};

    fn drain(board: &mut Board, mut mp: MovePicker, hist: &HistoryView) -> Vec<Move> {
        let mut out = Vec::new();
        while let Some(mv) = mp.next(board, hist, false) {
            out.push(mv);
        }
        out
    }

    #[test]
    fn yields_each_pseudo_legal_move_once() {
        let mut board: Board =
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4"
                .parse()
                .unwrap();
        let main = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let cont = ContinuationHistory::new();
        let sentinel = cont.table(CONT_HISTORY_SENTINEL);
        let hist = HistoryView {
            main: &main,
            capture: &capture,
            cont: [sentinel, sentinel, sentinel],
        };
        let mp = MovePicker::new_main(&board, Move::NONE, 5, [Move::NONE; 2], Move::NONE);
        let yielded = drain(&mut board, mp, &hist);
        let all = board.generate_pseudo(GenKind::All);
        assert_eq!(yielded.len(), all.len());
        for mv in &yielded {
            assert!(all.contains(*mv));
        }
        let unique: std::collections::HashSet<_> = yielded.iter().collect();
        assert_eq!(unique.len(), yielded.len());
    }

    #[test]
    fn tt_move_comes_first() {
        let mut board = Board::new();
        let tt_move = board.parse_move("e2e4").unwrap();
        let main = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let cont = ContinuationHistory::new();
        let sentinel = cont.table(CONT_HISTORY_SENTINEL);
        let hist = HistoryView {
            main: &main,
            capture: &capture,
            cont: [sentinel, sentinel, sentinel],
        };
        let mut mp = MovePicker::new_main(&board, tt_move, 5, [Move::NONE; 2], Move::NONE);
        assert_eq!(mp.next(&mut board, &hist, false), Some(tt_move));
    }

    #[test]
    fn winning_capture_before_losing_capture() {
        // Both captures of d5 lose material to exd5; the cheaper attacker
        // is tried first and the queen capture lands at the very end.
        let mut board: Board = "4k3/8/4p3/3p4/8/2N5/3Q4/4K3 w - - 0 1".parse().unwrap();
        let main = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let cont = ContinuationHistory::new();
        let sentinel = cont.table(CONT_HISTORY_SENTINEL);
        let hist = HistoryView {
            main: &main,
            capture: &capture,
            cont: [sentinel, sentinel, sentinel],
        };
        let mp = MovePicker::new_main(&board, Move::NONE, 5, [Move::NONE; 2], Move::NONE);
        let yielded = drain(&mut board, mp, &hist);
        let knight_takes = yielded
            .iter()
            .position(|m| m.to_string() == "c3d5")
            .unwrap();
        let queen_takes = yielded
            .iter()
            .position(|m| m.to_string() == "d2d5")
            .unwrap();
        assert!(knight_takes < queen_takes);
        // The losing queen capture is deferred to the very tail.
        assert_eq!(queen_takes, yielded.len() - 1);
    }

    #[test]
    fn skip_quiets_drops_quiet_moves() {
        let mut board = Board::new();
        let main = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let cont = ContinuationHistory::new();
        let sentinel = cont.table(CONT_HISTORY_SENTINEL);
        let hist = HistoryView {
            main: &main,
            capture: &capture,
            cont: [sentinel, sentinel, sentinel],
        };
        let mut mp = MovePicker::new_main(&board, Move::NONE, 5, [Move::NONE; 2], Move::NONE);
        // No captures exist in the opening position, so skipping quiets
        // leaves nothing at all.
        assert_eq!(mp.next(&mut board, &hist, true), None);
    }

    #[test]
    fn qsearch_yields_captures_only_below_horizon() {
        let mut board: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        let main = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let cont = ContinuationHistory::new();
        let sentinel = cont.table(CONT_HISTORY_SENTINEL);
        let hist = HistoryView {
            main: &main,
            capture: &capture,
            cont: [sentinel, sentinel, sentinel],
        };
        let mp = MovePicker::new_qsearch(&board, Move::NONE, -2);
        let yielded = drain(&mut board, mp, &hist);
        assert_eq!(yielded.len(), 1);
        assert_eq!(yielded[0].to_string(), "e4d5");
    }
}
