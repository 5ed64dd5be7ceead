//! Ordered PGN tag pairs

use serde::Serialize;
use shakmaty::Chess;

use crate::board;
use crate::error::Result;

/// The seven mandatory tags and the values used until a game supplies its own.
pub const SEVEN_TAG_ROSTER: [(&str, &str); 7] = [
    ("Event", "?"),
    ("Site", "?"),
    ("Date", "????.??.??"),
    ("Round", "?"),
    ("White", "?"),
    ("Black", "?"),
    ("Result", "*"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headers {
    tags: Vec<(String, String)>,
}

impl Default for Headers {
    fn default() -> Self {
        Self {
            tags: SEVEN_TAG_ROSTER
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers without the roster defaults.
    pub fn empty() -> Self {
        Self { tags: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces an existing tag in place or appends a new one.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.tags.iter_mut().find(|(n, _)| n == name) {
            Some(tag) => tag.1 = value.to_string(),
            None => self.tags.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.tags.iter().position(|(n, _)| n == name)?;
        Some(self.tags.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn result(&self) -> &str {
        self.get("Result").unwrap_or("*")
    }

    pub fn summary(&self) -> String {
        format!(
            "{} vs {} - {}",
            self.get("White").unwrap_or("?"),
            self.get("Black").unwrap_or("?"),
            self.result()
        )
    }

    /// Starting position: the `FEN` tag when present, else the standard setup.
    pub fn initial_board(&self) -> Result<Chess> {
        match self.get("FEN") {
            Some(fen) if self.get("SetUp") != Some("0") => board::chess_from_fen(fen),
            _ => Ok(Chess::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Color, Position};

    #[test]
    fn test_roster_defaults_in_order() {
        let headers = Headers::new();
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Event", "Site", "Date", "Round", "White", "Black", "Result"]);
        assert_eq!(headers.result(), "*");
        assert_eq!(headers.get("Date"), Some("????.??.??"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.set("White", "Alice");
        headers.set("WhiteElo", "2100");
        assert_eq!(headers.get("White"), Some("Alice"));
        assert_eq!(headers.len(), 8);
        assert_eq!(headers.iter().nth(4), Some(("White", "Alice")));
        assert_eq!(headers.remove("WhiteElo").as_deref(), Some("2100"));
        assert_eq!(headers.summary(), "Alice vs ? - *");
    }

    #[test]
    fn test_initial_board_from_fen() {
        let mut headers = Headers::new();
        headers.set("SetUp", "1");
        headers.set("FEN", "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
        let board = headers.initial_board().unwrap();
        assert_eq!(board.turn(), Color::Black);

        headers.set("FEN", "garbage");
        assert!(headers.initial_board().is_err());
    }
}
