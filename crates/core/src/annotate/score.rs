//! Engine scores as they appear in `[%eval]` comment tags

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

/// Matches `[%eval 0.35]` and the short `[% 0.35]` form.
static EVAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(%|%eval)[ ]+([^\n\t \]]+)\]").expect("eval tag pattern compiles"));

/// A White-relative engine score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Pawns(f64),
    /// Mate in `n` plies; negative when White gets mated.
    Mate(i32),
}

impl Score {
    /// Numeric value used for comparisons. Mate in `n` becomes
    /// `1001 - |n|` whichever side mates.
    pub fn value(&self) -> f64 {
        match *self {
            Score::Pawns(pawns) => pawns,
            Score::Mate(n) => 1001.0 - f64::from(n.abs()),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Pawns(pawns) => write!(f, "{:+.2}", pawns),
            Score::Mate(n) => write!(f, "#{}", n),
        }
    }
}

impl FromStr for Score {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || Error::InvalidScore(s.to_string());
        match text.strip_prefix('#') {
            Some(mate) => mate
                .trim_start_matches('+')
                .parse()
                .map(Score::Mate)
                .map_err(|_| invalid()),
            None => text
                .parse::<f64>()
                .ok()
                .filter(|pawns| pawns.is_finite())
                .map(Score::Pawns)
                .ok_or_else(invalid),
        }
    }
}

/// Scores found in the `[%eval]` tags of a comment.
pub fn eval_tags(comment: &str) -> Vec<&str> {
    EVAL_TAG
        .captures_iter(comment)
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect()
}

/// Drops every eval tag from `comment` and puts `[%eval score]` in front.
pub fn replace_eval(comment: &str, score: Score) -> String {
    let rest = EVAL_TAG.replace_all(comment, "");
    let rest = rest.trim();
    if rest.is_empty() {
        format!("[%eval {}]", score)
    } else {
        format!("[%eval {}] {}", score, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scores() {
        assert_eq!("+0.35".parse::<Score>().unwrap(), Score::Pawns(0.35));
        assert_eq!("-1.5".parse::<Score>().unwrap(), Score::Pawns(-1.5));
        assert_eq!("#-3".parse::<Score>().unwrap(), Score::Mate(-3));
        assert_eq!("#+2".parse::<Score>().unwrap(), Score::Mate(2));
        assert!(matches!("#x".parse::<Score>(), Err(Error::InvalidScore(_))));
        assert!("".parse::<Score>().is_err());
        assert!("NaN".parse::<Score>().is_err());
    }

    #[test]
    fn test_mate_value() {
        assert_eq!(Score::Mate(3).value(), 998.0);
        assert_eq!(Score::Mate(-3).value(), 998.0);
        assert_eq!("#-3".parse::<Score>().unwrap().value(), 998.0);
        assert_eq!(Score::Mate(0).value(), 1001.0);
        assert!(Score::Mate(1).value() > Score::Mate(5).value());
        assert!(Score::Mate(-1).value() > Score::Mate(-5).value());
        assert_eq!(Score::Pawns(0.5).value(), 0.5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Score::Pawns(0.35).to_string(), "+0.35");
        assert_eq!(Score::Pawns(-2.0).to_string(), "-2.00");
        assert_eq!(Score::Mate(-3).to_string(), "#-3");
    }

    #[test]
    fn test_replace_eval() {
        assert_eq!(replace_eval("", Score::Pawns(0.3)), "[%eval +0.30]");
        assert_eq!(
            replace_eval("[%eval 0.1] good [% -0.2] move", Score::Mate(2)),
            "[%eval #2] good  move"
        );
        assert_eq!(eval_tags("[%eval 0.1] x [% #3]"), vec!["0.1", "#3"]);
        assert!(eval_tags("[%clk 0:01:00]").is_empty());
    }
}
