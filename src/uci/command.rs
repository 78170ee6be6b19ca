//! UCI command parsing.

#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption(Vec<String>),
    Stop,
    PonderHit,
    Quit,
    Unknown(String),
}

/// Raw `go` arguments; times are not interpreted here.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub mate: Option<i32>,
    pub perft: Option<usize>,
    pub ponder: bool,
    pub infinite: bool,
    pub searchmoves: Vec<String>,
}

#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_params(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;
    while i < parts.len() {
        let consumed = match parts[i] {
            "wtime" => {
                params.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                params.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                params.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                params.binc = parse_next(parts, i);
                2
            }
            "movestogo" => {
                params.movestogo = parse_next(parts, i);
                2
            }
            "movetime" => {
                params.movetime = parse_next(parts, i);
                2
            }
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            "mate" => {
                params.mate = parse_next(parts, i);
                2
            }
            "perft" => {
                params.perft = parse_next(parts, i);
                2
            }
            "ponder" => {
                params.ponder = true;
                1
            }
            "infinite" => {
                params.infinite = true;
                1
            }
            "searchmoves" => {
                // Everything that looks like a move until the next keyword.
                let mut j = i + 1;
                while j < parts.len() && is_move_token(parts[j]) {
                    params.searchmoves.push(parts[j].to_string());
                    j += 1;
                }
                j - i
            }
            _ => 1,
        };
        i += consumed;
    }
    params
}

fn is_move_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    (4..=5).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_lowercase()
        && bytes[3].is_ascii_digit()
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned()),
        "go" => UciCommand::Go(owned()),
        "setoption" => UciCommand::SetOption(owned()),
        "stop" => UciCommand::Stop,
        "ponderhit" => UciCommand::PonderHit,
        "quit" => UciCommand::Quit,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };
    Some(cmd)
}

/// Splits `setoption name <Name> value <Value>`; names may contain spaces.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, String)> {
    let name_idx = parts.iter().position(|p| *p == "name")?;
    let value_idx = parts.iter().position(|p| *p == "value");
    let name = match value_idx {
        Some(v) if v > name_idx + 1 => parts[name_idx + 1..v].join(" "),
        None if name_idx + 1 < parts.len() => parts[name_idx + 1..].join(" "),
        _ => return None,
    };
    let value = value_idx
        .map(|v| parts[v + 1..].join(" "))
        .unwrap_or_default();
    Some((name, value))
}
