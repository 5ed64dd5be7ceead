//! Engine scores read from a JSON file
//!
//! The file holds one entry per ply:
//! `[{"scores": ["+0.30"], "pvs": [["e7e5", "g1f3"]]}, ...]`. PVs are UCI
//! lines from the position after that ply.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use pgn_analyzer_core::annotate::{parse_pv, Analysis, Score, ScoreSource};
use pgn_analyzer_core::{Game, NodeId, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct PlyEntry {
    pub scores: Vec<String>,
    #[serde(default)]
    pub pvs: Vec<Vec<String>>,
}

pub struct JsonScores {
    plies: Vec<PlyEntry>,
}

impl JsonScores {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self {
            plies: serde_json::from_str(text)?,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }
}

impl ScoreSource for JsonScores {
    fn analyse(&mut self, game: &Game, start: NodeId, plies: usize) -> Result<Analysis> {
        let nodes: Vec<NodeId> = if start == game.root() {
            game.mainline_from(start).collect()
        } else {
            std::iter::once(start).chain(game.mainline_from(start)).collect()
        };
        let with_pvs = self.plies.iter().any(|entry| !entry.pvs.is_empty());

        let mut analysis = Analysis::default();
        for (index, entry) in self.plies.iter().take(plies).enumerate() {
            let scores = entry
                .scores
                .iter()
                .map(|text| text.parse())
                .collect::<Result<Vec<Score>>>()?;
            analysis.scores.push(scores);
            if with_pvs {
                let lines = match nodes.get(index) {
                    Some(&id) => {
                        let position = game.board(id)?;
                        entry
                            .pvs
                            .iter()
                            .map(|pv| parse_pv(&position, pv))
                            .collect::<Result<Vec<_>>>()?
                    }
                    None => Vec::new(),
                };
                analysis.pvs.push(lines);
            }
        }
        Ok(analysis)
    }
}
