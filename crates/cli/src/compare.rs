//! Cross-check of parsed mainlines against pgn-reader

use std::fs::File;
use std::io;
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Position};

use pgn_analyzer_core::board;

#[derive(Default)]
struct OracleTags {
    fen: Option<String>,
}

struct OracleLine {
    position: Chess,
    moves: Vec<String>,
    success: bool,
}

/// Collects the UCI mainline of each game, or `None` when pgn-reader
/// could not follow it.
struct MainlineOracle;

impl Visitor for MainlineOracle {
    type Tags = OracleTags;
    type Movetext = OracleLine;
    type Output = Option<Vec<String>>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(OracleTags::default())
    }

    fn tag(&mut self, tags: &mut Self::Tags, name: &[u8], value: RawTag<'_>) -> ControlFlow<Self::Output> {
        if name == b"FEN" {
            tags.fen = Some(value.decode_utf8_lossy().to_string());
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.fen {
            Some(fen) => board::chess_from_fen(&fen).ok(),
            None => Some(Chess::default()),
        };
        ControlFlow::Continue(OracleLine {
            success: start.is_some(),
            position: start.unwrap_or_default(),
            moves: Vec::new(),
        })
    }

    fn san(&mut self, line: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if !line.success {
            return ControlFlow::Continue(());
        }
        let played = san
            .san
            .to_move(&line.position)
            .ok()
            .and_then(|mv| {
                let uci = board::move_to_uci(&mv);
                line.position.clone().play(mv).ok().map(|next| (uci, next))
            });
        match played {
            Some((uci, next)) => {
                line.moves.push(uci);
                line.position = next;
            }
            None => line.success = false,
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _line: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, line: Self::Movetext) -> Self::Output {
        line.success.then_some(line.moves)
    }
}

/// Mainlines of every game in `path` as pgn-reader sees them.
pub fn oracle_mainlines(path: &Path) -> io::Result<Vec<Option<Vec<String>>>> {
    let mut reader = Reader::new(File::open(path)?);
    let mut oracle = MainlineOracle;
    let mut lines = Vec::new();
    while let Some(line) = reader.read_game(&mut oracle)? {
        lines.push(line);
    }
    Ok(lines)
}

/// Differences between our mainlines and the oracle's, one message each.
/// Games either side failed to read are passed over.
pub fn compare(ours: &[Option<Vec<String>>], oracle: &[Option<Vec<String>>]) -> Vec<String> {
    let mut problems = Vec::new();
    if ours.len() != oracle.len() {
        problems.push(format!("game count differs: {} vs {}", ours.len(), oracle.len()));
    }
    for (index, (mine, theirs)) in ours.iter().zip(oracle).enumerate() {
        let (Some(mine), Some(theirs)) = (mine, theirs) else {
            continue;
        };
        if mine != theirs {
            let ply = mine.iter().zip(theirs).take_while(|(a, b)| a == b).count();
            problems.push(format!(
                "game {}: mainlines diverge at ply {} ({} vs {} plies)",
                index + 1,
                ply + 1,
                mine.len(),
                theirs.len()
            ));
        }
    }
    problems
}
