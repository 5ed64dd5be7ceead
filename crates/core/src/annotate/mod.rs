//! Move classification from engine scores
//!
//! An [`Annotator`] holds two rule lists: one consulted when the score after
//! a move is positive, one when it is negative. Each rule maps a score drop
//! threshold to a NAG and says whether the engine's principal variations
//! should be added as hints.

mod score;

use shakmaty::{Chess, Color};
use tracing::debug;

use crate::board;
use crate::error::{Error, Result};
use crate::game::{Game, NodeId, PlyMove};
use crate::parser::{
    NAG_BLUNDER, NAG_BRILLIANT_MOVE, NAG_DUBIOUS_MOVE, NAG_GOOD_MOVE, NAG_MISTAKE, NAG_SPECULATIVE_MOVE,
};

pub use score::{eval_tags, replace_eval, Score};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationRule {
    pub threshold: f64,
    pub nag: u16,
    pub add_variant: bool,
}

/// Scores and principal variations for consecutive plies. `pvs` is either
/// empty or as long as `scores`.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub scores: Vec<Vec<Score>>,
    pub pvs: Vec<Vec<Vec<PlyMove>>>,
}

/// Something that can evaluate a line, usually an engine.
pub trait ScoreSource {
    /// Scores for the `plies` moves following `start` on the mainline.
    fn analyse(&mut self, game: &Game, start: NodeId, plies: usize) -> Result<Analysis>;
}

#[derive(Debug, Clone, Default)]
pub struct Annotator {
    name: String,
    /// Sorted by threshold, highest first.
    positive: Vec<AnnotationRule>,
    /// Sorted by threshold, lowest first.
    negative: Vec<AnnotationRule>,
}

impl Annotator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positive_rules(&self) -> &[AnnotationRule] {
        &self.positive
    }

    pub fn negative_rules(&self) -> &[AnnotationRule] {
        &self.negative
    }

    /// Installs a rule, replacing any earlier one for the same NAG.
    fn set_rule(&mut self, nag: u16, threshold: f64, add_variant: bool) {
        self.positive.retain(|rule| rule.nag != nag);
        self.negative.retain(|rule| rule.nag != nag);
        let rule = AnnotationRule { threshold, nag, add_variant };
        if threshold > 0.0 {
            self.positive.push(rule);
            self.positive.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));
        } else {
            self.negative.push(rule);
            self.negative.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        }
    }

    /// `$4`. Hints are usually wanted for blunders.
    pub fn set_blunder(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_BLUNDER, -score.abs(), add_variant);
    }

    /// `$6`
    pub fn set_dubious_move(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_DUBIOUS_MOVE, -score.abs(), add_variant);
    }

    /// `$2`
    pub fn set_poor_move(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_MISTAKE, -score.abs(), add_variant);
    }

    /// `$3`
    pub fn set_brilliant_move(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_BRILLIANT_MOVE, score.abs(), add_variant);
    }

    /// `$5`
    pub fn set_speculative_move(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_SPECULATIVE_MOVE, score.abs(), add_variant);
    }

    /// `$1`
    pub fn set_good_move(&mut self, score: f64, add_variant: bool) {
        self.set_rule(NAG_GOOD_MOVE, score.abs(), add_variant);
    }

    /// First rule matching the move that led to a position with `turn` to
    /// move. Both scores are White-relative.
    pub fn classify(&self, score: f64, last: f64, turn: Color) -> Option<AnnotationRule> {
        let (score, last) = match turn {
            Color::White => (score, last),
            Color::Black => (-score, -last),
        };
        let drop = last - score;
        if score > 0.0 && !self.positive.is_empty() {
            self.positive.iter().find(|rule| drop > rule.threshold).copied()
        } else if score < 0.0 {
            self.negative.iter().find(|rule| drop < rule.threshold).copied()
        } else {
            None
        }
    }

    /// Annotates the mainline from `start` with one entry of `scores` per
    /// ply. Starting at the root also stamps the `Annotator` header and
    /// begins with the first move. `pvs[i]` holds lines from the position
    /// after ply `i`; they are added as alternatives to ply `i + 1` when its
    /// rule asks for it or `force_hints` is set.
    ///
    /// Returns whether any hint was added.
    pub fn apply(
        &self,
        game: &mut Game,
        start: NodeId,
        scores: &[Vec<Score>],
        pvs: &[Vec<Vec<PlyMove>>],
        force_hints: bool,
    ) -> Result<bool> {
        if scores.is_empty() {
            return Err(Error::NoScores);
        }
        if !pvs.is_empty() && pvs.len() != scores.len() {
            return Err(Error::ScoreLengthMismatch {
                scores: scores.len(),
                variations: pvs.len(),
            });
        }
        if game.get(start).is_none() {
            return Err(Error::UnknownNode(start.index()));
        }

        let mut current = if start == game.root() {
            if !self.name.is_empty() {
                game.headers.set("Annotator", &self.name);
            }
            game.next(start)
        } else {
            Some(start)
        };
        let mut last = 0.0;
        let mut hints_added = false;

        for (ply, ply_scores) in scores.iter().enumerate() {
            let Some(id) = current else {
                break;
            };
            current = game.next(id);
            let Some(&score) = ply_scores.first() else {
                continue;
            };

            let rule = self.classify(score.value(), last, game.turn(id)?);
            last = score.value();
            let node = game.node_mut(id);
            node.nags.clear();
            node.nags.extend(rule.map(|rule| rule.nag));
            node.comment = replace_eval(&node.comment, score);
            debug!(ply, score = %score, nag = ?rule.map(|rule| rule.nag), "annotated move");

            let wants_hints = force_hints || rule.is_some_and(|rule| rule.add_variant);
            let lines = match ply.checked_sub(1).and_then(|previous| pvs.get(previous)) {
                Some(lines) if wants_hints => lines,
                _ => continue,
            };
            let Some(parent) = game.parent(id) else {
                continue;
            };
            hints_added = true;
            for line in lines.iter().take(ply_scores.len()) {
                debug!(ply, moves = line.len(), "adding hint");
                game.add_line(parent, line.iter().cloned());
            }
        }
        Ok(hints_added)
    }

    /// Asks `source` for `plies` scores from `start` and applies them.
    pub fn annotate<S: ScoreSource>(
        &self,
        game: &mut Game,
        start: NodeId,
        source: &mut S,
        plies: usize,
        force_hints: bool,
    ) -> Result<bool> {
        let analysis = source.analyse(game, start, plies)?;
        self.apply(game, start, &analysis.scores, &analysis.pvs, force_hints)
    }

    /// Clears mainline comments and/or drops side variations.
    pub fn remove(game: &mut Game, comments: bool, variations: bool) {
        game.strip(comments, variations);
    }
}

/// Resolves a principal variation given in UCI notation from `position`.
pub fn parse_pv<S: AsRef<str>>(position: &Chess, moves: &[S]) -> Result<Vec<PlyMove>> {
    let mut position = position.clone();
    let mut line = Vec::with_capacity(moves.len());
    for text in moves {
        let text = text.as_ref();
        let mv = board::resolve_uci(&position, text).ok_or_else(|| Error::IllegalMove(text.to_string()))?;
        let ply = PlyMove::Played(mv);
        position = ply.play(&position)?;
        line.push(ply);
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_pgn_string;

    fn scores(texts: &[&str]) -> Vec<Vec<Score>> {
        texts
            .iter()
            .map(|text| if text.is_empty() { vec![] } else { vec![text.parse().unwrap()] })
            .collect()
    }

    fn sample_game() -> Game {
        let pgn = "[Event \"Test\"]\n\n1. e4 {[%eval 0.1] book} e5 2. Nf3 Nc6 *\n";
        parse_pgn_string(pgn).unwrap().remove(0)
    }

    #[test]
    fn test_setters_normalise_sign_and_sort() {
        let mut annotator = Annotator::new("engine");
        annotator.set_good_move(-0.5, false);
        annotator.set_brilliant_move(1.0, true);
        annotator.set_blunder(3.0, true);
        annotator.set_poor_move(1.0, false);
        annotator.set_dubious_move(-0.5, false);

        let positive: Vec<_> = annotator.positive_rules().iter().map(|r| (r.threshold, r.nag)).collect();
        assert_eq!(positive, vec![(1.0, NAG_BRILLIANT_MOVE), (0.5, NAG_GOOD_MOVE)]);
        let negative: Vec<_> = annotator.negative_rules().iter().map(|r| (r.threshold, r.nag)).collect();
        assert_eq!(
            negative,
            vec![(-3.0, NAG_BLUNDER), (-1.0, NAG_MISTAKE), (-0.5, NAG_DUBIOUS_MOVE)]
        );

        annotator.set_blunder(2.0, true);
        assert_eq!(annotator.negative_rules().len(), 3);
        assert_eq!(annotator.negative_rules()[0].threshold, -2.0);
    }

    #[test]
    fn test_classify() {
        let mut annotator = Annotator::new("");
        annotator.set_blunder(2.0, true);
        annotator.set_poor_move(1.0, false);
        // White dropped from +3 to +0.5; Black is to move.
        let rule = annotator.classify(0.5, 3.0, Color::Black).unwrap();
        assert_eq!(rule.nag, NAG_BLUNDER);
        assert!(rule.add_variant);
        let rule = annotator.classify(0.5, 1.8, Color::Black).unwrap();
        assert_eq!(rule.nag, NAG_MISTAKE);
        assert!(annotator.classify(0.5, 0.6, Color::Black).is_none());
        assert!(annotator.classify(0.0, 3.0, Color::Black).is_none());
        assert!(annotator.classify(0.5, 3.0, Color::White).is_none());
    }

    #[test]
    fn test_apply_marks_blunder_and_adds_hint() {
        let mut game = sample_game();
        let mut annotator = Annotator::new("Analyzer");
        annotator.set_blunder(2.0, true);

        let nodes: Vec<_> = game.mainline().collect();
        let hint = parse_pv(&game.board(nodes[1]).unwrap(), &["d2d4"]).unwrap();
        let pvs = vec![vec![], vec![hint], vec![], vec![]];
        let root = game.root();
        let added = annotator
            .apply(&mut game, root, &scores(&["+0.30", "+3.00", "+0.50", "+0.40"]), &pvs, false)
            .unwrap();

        assert!(added);
        assert_eq!(game.headers.get("Annotator"), Some("Analyzer"));
        assert_eq!(game.node(nodes[0]).comment, "[%eval +0.30] book");
        assert!(game.node(nodes[0]).nags.is_empty());
        assert_eq!(game.node(nodes[2]).comment, "[%eval +0.50]");
        assert_eq!(game.node(nodes[2]).nags.iter().copied().collect::<Vec<_>>(), vec![NAG_BLUNDER]);
        assert!(game.node(nodes[3]).nags.is_empty());

        let alternatives = game.children(nodes[1]);
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0], nodes[2]);
        assert_eq!(game.san(alternatives[1]).unwrap().as_deref(), Some("d4"));
    }

    #[test]
    fn test_apply_mate_against_counts_as_large_score() {
        let mut game = sample_game();
        let mut annotator = Annotator::new("");
        annotator.set_blunder(2.0, true);

        let nodes: Vec<_> = game.mainline().collect();
        let root = game.root();
        let added = annotator
            .apply(&mut game, root, &scores(&["+0.30", "#-3", "+0.50", "+0.40"]), &[], false)
            .unwrap();

        assert!(!added);
        assert_eq!(game.node(nodes[1]).comment, "[%eval #-3]");
        assert!(game.node(nodes[1]).nags.is_empty());
        // #-3 is worth 998, so falling to +0.50 after it is a blunder.
        assert_eq!(game.node(nodes[2]).nags.iter().copied().collect::<Vec<_>>(), vec![NAG_BLUNDER]);
        assert!(game.node(nodes[3]).nags.is_empty());
    }

    #[test]
    fn test_apply_without_hint_rules() {
        let mut game = sample_game();
        let annotator = Annotator::new("");
        let nodes: Vec<_> = game.mainline().collect();
        game.node_mut(nodes[1]).nags.insert(NAG_GOOD_MOVE);

        let start = nodes[1];
        let added = annotator
            .apply(&mut game, start, &scores(&["", "+0.20"]), &[], true)
            .unwrap();
        assert!(!added);
        assert!(game.headers.get("Annotator").is_none());
        assert!(game.node(nodes[1]).nags.contains(&NAG_GOOD_MOVE));
        assert!(game.node(nodes[1]).comment.is_empty());
        assert_eq!(game.node(nodes[2]).comment, "[%eval +0.20]");
    }

    #[test]
    fn test_apply_forced_hints() {
        let mut game = sample_game();
        let annotator = Annotator::new("");
        let nodes: Vec<_> = game.mainline().collect();
        let hint = parse_pv(&game.board(nodes[0]).unwrap(), &["c7c5", "g1f3"]).unwrap();
        let pvs = vec![vec![hint], vec![]];
        let root = game.root();
        let added = annotator
            .apply(&mut game, root, &scores(&["+0.30", "+0.30"]), &pvs, true)
            .unwrap();
        assert!(added);
        assert_eq!(game.children(nodes[0]).len(), 2);
        assert_eq!(game.to_pgn().unwrap().matches("c5").count(), 1);
    }

    #[test]
    fn test_apply_preconditions() {
        let mut game = sample_game();
        let annotator = Annotator::new("");
        let root = game.root();
        assert!(matches!(annotator.apply(&mut game, root, &[], &[], false), Err(Error::NoScores)));
        let pvs = vec![vec![]];
        assert!(matches!(
            annotator.apply(&mut game, root, &scores(&["0.1", "0.2"]), &pvs, false),
            Err(Error::ScoreLengthMismatch { scores: 2, variations: 1 })
        ));
    }

    #[test]
    fn test_parse_pv_rejects_illegal_moves() {
        let position = Chess::default();
        assert!(matches!(parse_pv(&position, &["e2e5"]), Err(Error::IllegalMove(_))));
        assert_eq!(parse_pv(&position, &["e2e4", "e7e5"]).unwrap().len(), 2);
    }

    struct FixedSource(Analysis);

    impl ScoreSource for FixedSource {
        fn analyse(&mut self, _game: &Game, _start: NodeId, plies: usize) -> Result<Analysis> {
            let mut analysis = self.0.clone();
            analysis.scores.truncate(plies);
            Ok(analysis)
        }
    }

    #[test]
    fn test_annotate_from_source_and_remove() {
        let mut game = sample_game();
        let mut annotator = Annotator::new("Source");
        annotator.set_poor_move(1.0, false);
        let mut source = FixedSource(Analysis {
            scores: scores(&["+0.20", "+1.50", "+0.10", "+0.10"]),
            pvs: Vec::new(),
        });
        let root = game.root();
        let added = annotator.annotate(&mut game, root, &mut source, 4, false).unwrap();
        assert!(!added);
        let nodes: Vec<_> = game.mainline().collect();
        assert!(game.node(nodes[2]).nags.contains(&NAG_MISTAKE));

        Annotator::remove(&mut game, true, true);
        assert!(game.mainline().all(|id| game.node(id).comment.is_empty()));
    }
}
