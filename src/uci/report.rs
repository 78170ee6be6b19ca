//! Formatting of engine output lines.

use crate::board::search::{ScoreBound, SearchInfo};
use crate::board::types::{
    Move, Value, VALUE_MATE, VALUE_MATED_IN_MAX_PLY, VALUE_MATE_IN_MAX_PLY,
};

/// `score cp V` or `score mate N` with N in full moves, negative when the
/// engine is the one being mated.
#[must_use]
pub fn format_score(v: Value) -> String {
    if v >= VALUE_MATE_IN_MAX_PLY {
        format!("mate {}", (VALUE_MATE - v + 1) / 2)
    } else if v <= VALUE_MATED_IN_MAX_PLY {
        format!("mate {}", -(VALUE_MATE + v) / 2)
    } else {
        format!("cp {v}")
    }
}

#[must_use]
pub fn format_info(info: &SearchInfo) -> String {
    let mut line = format!(
        "info depth {} seldepth {} multipv {} score {}",
        info.depth,
        info.sel_depth.max(1),
        info.multipv,
        format_score(info.score)
    );
    match info.bound {
        ScoreBound::Lower => line.push_str(" lowerbound"),
        ScoreBound::Upper => line.push_str(" upperbound"),
        ScoreBound::Exact => {}
    }
    line.push_str(&format!(
        " nodes {} nps {}",
        info.nodes, info.nps
    ));
    if info.time_ms > 1000 {
        line.push_str(&format!(" hashfull {}", info.hashfull));
    }
    line.push_str(&format!(" time {}", info.time_ms));
    line.push_str(" pv");
    for mv in &info.pv {
        line.push_str(&format!(" {mv}"));
    }
    line
}

#[must_use]
pub fn format_bestmove(best: Move, ponder: Option<Move>) -> String {
    if !best.is_some() {
        return "bestmove (none)".to_string();
    }
    match ponder {
        Some(p) if p.is_some() => format!("bestmove {best} ponder {p}"),
        _ => format!("bestmove {best}"),
    }
}
