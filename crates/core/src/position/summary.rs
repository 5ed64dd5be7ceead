//! Printable overview of a position's features

use std::fmt;

use serde::Serialize;
use shakmaty::{Bitboard, Color};

use super::{GamePhase, MaterialCount, Position, ScoreUnit, DEFAULT_K};

/// Whether a feature is good for the side that has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Plus,
    Minus,
    Neutral,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Plus => "+",
            Polarity::Minus => "-",
            Polarity::Neutral => "0",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub name: &'static str,
    pub polarity: Polarity,
    pub white: Vec<String>,
    pub black: Vec<String>,
}

impl Feature {
    fn new(name: &'static str, polarity: Polarity, query: impl Fn(Color) -> Bitboard) -> Self {
        let squares = |color| query(color).into_iter().map(|square| square.to_string()).collect();
        Self {
            name,
            polarity,
            white: squares(Color::White),
            black: squares(Color::Black),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub fen: String,
    pub phase: GamePhase,
    pub unit: ScoreUnit,
    pub white_material: MaterialCount,
    pub black_material: MaterialCount,
    pub material_balance: MaterialCount,
    /// White's material advantage in `unit`.
    pub material_score: f64,
    pub white_position_score: f64,
    pub black_position_score: f64,
    pub winning_probability: f64,
    pub white_bishop_pair: bool,
    pub black_bishop_pair: bool,
    pub features: Vec<Feature>,
}

impl PositionSummary {
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.name == name)
    }
}

impl fmt::Display for PositionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FEN: {}", self.fen)?;
        writeln!(f, "Phase: {}", self.phase)?;
        writeln!(
            f,
            "Material: white {} black {}, score {:+.2}",
            self.white_material.total(),
            self.black_material.total(),
            self.material_score
        )?;
        writeln!(
            f,
            "Position score: white {:.2} black {:.2}",
            self.white_position_score, self.black_position_score
        )?;
        writeln!(f, "Winning probability: {:.3}", self.winning_probability)?;
        writeln!(
            f,
            "Bishop pair: white {} black {}",
            self.white_bishop_pair, self.black_bishop_pair
        )?;
        writeln!(f, "{:<28} {:>2}  {:<24} {}", "Feature", "", "White", "Black")?;
        for feature in &self.features {
            writeln!(
                f,
                "{:<28} {:>2}  {:<24} {}",
                feature.name,
                feature.polarity,
                feature.white.join(" "),
                feature.black.join(" ")
            )?;
        }
        Ok(())
    }
}

impl Position {
    pub fn summary(&self) -> PositionSummary {
        use Polarity::{Minus, Neutral, Plus};

        let features = vec![
            Feature::new("Attacked", Minus, |c| self.attacked_pieces(c)),
            Feature::new("Attacking", Plus, |c| self.attacking_pieces(c)),
            Feature::new("Bad bishops", Minus, |c| self.bad_bishops(c)),
            Feature::new("Blocked pawns", Minus, |c| self.blocked_pawns(c)),
            Feature::new("Controlled central squares", Plus, |c| {
                self.controlled_central_squares(c, false)
            }),
            Feature::new("Fiancettoed bishops", Plus, |c| self.fiancettoed_bishops(c)),
            Feature::new("Hanging", Minus, |c| self.hanging_pieces(c)),
            Feature::new("Isolated", Minus, |c| self.isolated_pawns(c)),
            Feature::new("Passed", Plus, |c| self.passed_pawns(c)),
            Feature::new("Pinned", Minus, |c| self.pinned_pieces(c)),
            Feature::new("Reachable squares", Neutral, |c| self.reachable_squares(c)),
            Feature::new("Stacked", Minus, |c| self.stacked_pawns(c)),
            Feature::new("Supported", Plus, |c| self.supported_pawns(c)),
            Feature::new("Trapped", Minus, |c| self.trapped_pieces(c)),
            Feature::new("Undefended", Minus, |c| self.undefended_pieces(c, true)),
        ];

        PositionSummary {
            fen: self.fen(),
            phase: self.game_phase(),
            unit: self.unit(),
            white_material: self.material(Color::White),
            black_material: self.material(Color::Black),
            material_balance: self.material_balance(),
            material_score: self.scaled(self.material_score(Color::White)),
            white_position_score: self.scaled(self.simple_position_score(Color::White)),
            black_position_score: self.scaled(self.simple_position_score(Color::Black)),
            winning_probability: self.winning_probability(DEFAULT_K),
            white_bishop_pair: self.has_bishop_pair(Color::White),
            black_bishop_pair: self.has_bishop_pair(Color::Black),
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_every_feature() {
        let position = Position::from_fen("4k3/8/8/4n3/8/4Q3/8/4K3 b - - 0 1").unwrap();
        let summary = position.summary();
        assert_eq!(summary.features.len(), 15);
        let pinned = summary.feature("Pinned").unwrap();
        assert_eq!(pinned.polarity, Polarity::Minus);
        assert_eq!(pinned.black, vec!["e5".to_string()]);
        assert!(pinned.white.is_empty());
        assert_eq!(summary.feature("Reachable squares").unwrap().polarity, Polarity::Neutral);
        assert_eq!(summary.material_score, 900.0 - 310.0);
    }

    #[test]
    fn test_summary_display_and_json() {
        let position = Position::from_fen("4k3/8/8/8/3P4/8/8/4K3 w - - 0 1")
            .unwrap()
            .with_unit(ScoreUnit::Pawns);
        let summary = position.summary();
        let text = summary.to_string();
        assert!(text.contains("Phase: end game"));
        assert!(text.contains("score +1.00"));
        assert!(text.lines().any(|line| line.starts_with("Passed") && line.contains("d4")));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["phase"], "end_game");
        assert_eq!(json["unit"], "pawns");
        assert_eq!(json["features"][8]["name"], "Passed");
        assert_eq!(json["features"][8]["polarity"], "plus");
        assert_eq!(json["features"][8]["white"][0], "d4");
    }

    #[test]
    fn test_polarity_symbols() {
        assert_eq!(Polarity::Plus.to_string(), "+");
        assert_eq!(Polarity::Minus.to_string(), "-");
        assert_eq!(Polarity::Neutral.to_string(), "0");
    }
}
