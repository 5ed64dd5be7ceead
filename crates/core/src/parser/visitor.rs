//! Visitor interface driven by [`PgnReader`](super::PgnReader)
//!
//! The reader calls these hooks in game order. Four standard visitors cover
//! the common cases: a full game tree, headers only, the final board only,
//! or nothing at all.

use shakmaty::Chess;
use tracing::debug;

use crate::error::GameError;
use crate::game::{Game, Headers, NodeId, PlyMove};

/// Tells the reader to skip the movetext of the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Skip(pub bool);

pub trait Visitor {
    type Output;

    fn begin_game(&mut self) -> Skip {
        Skip(false)
    }

    /// Headers the reader should track for this game, roster defaults unless
    /// overridden.
    fn begin_headers(&mut self) -> Headers {
        Headers::new()
    }

    fn visit_header(&mut self, _name: &str, _value: &str) {}

    fn end_headers(&mut self) -> Skip {
        Skip(false)
    }

    fn visit_comment(&mut self, _comment: &str) {}

    fn visit_board(&mut self, _board: &Chess) {}

    fn visit_move(&mut self, _board: &Chess, _mv: &PlyMove) {}

    fn visit_nag(&mut self, _nag: u16) {}

    fn begin_variation(&mut self) {}

    fn end_variation(&mut self) {}

    fn visit_result(&mut self, _result: &str) {}

    fn handle_error(&mut self, _error: GameError) {}

    fn end_game(&mut self) {}

    fn result(self) -> Self::Output;
}

/// Builds the complete [`Game`] tree.
pub struct GameBuilder {
    game: Game,
    /// Current node per open variation, innermost last.
    stack: Vec<NodeId>,
    in_variation: bool,
    starting_comment: Option<String>,
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GameBuilder {
    pub fn new() -> Self {
        let game = Game::default();
        let root = game.root();
        Self {
            game,
            stack: vec![root],
            in_variation: false,
            starting_comment: None,
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.game.root())
    }
}

impl Visitor for GameBuilder {
    type Output = Game;

    fn visit_header(&mut self, name: &str, value: &str) {
        self.game.headers.set(name, value);
    }

    fn visit_comment(&mut self, comment: &str) {
        if self.in_variation {
            self.starting_comment = Some(comment.to_string());
            return;
        }
        let node = self.game.node_mut(self.current());
        if !node.comment.is_empty() {
            node.comment.push(' ');
        }
        node.comment.push_str(comment);
    }

    fn visit_move(&mut self, _board: &Chess, mv: &PlyMove) {
        let id = self.game.add_variation(self.current(), mv.clone());
        if let Some(comment) = self.starting_comment.take() {
            self.game.node_mut(id).starting_comment = comment;
        }
        self.in_variation = false;
        if let Some(top) = self.stack.last_mut() {
            *top = id;
        }
    }

    fn visit_nag(&mut self, nag: u16) {
        if nag > 0 {
            let current = self.current();
            self.game.node_mut(current).nags.insert(nag);
        }
    }

    fn begin_variation(&mut self) {
        let current = self.current();
        let parent = self.game.parent(current).unwrap_or(self.game.root());
        self.stack.push(parent);
        self.in_variation = true;
    }

    fn end_variation(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self.in_variation = false;
        self.starting_comment = None;
    }

    fn visit_result(&mut self, result: &str) {
        if self.game.headers.result() == "*" {
            self.game.headers.set("Result", result);
        }
    }

    fn handle_error(&mut self, error: GameError) {
        self.game.errors.push(error);
    }

    fn result(self) -> Game {
        self.game
    }
}

/// Collects the tag pairs and skips the movetext.
#[derive(Default)]
pub struct HeadersBuilder {
    headers: Headers,
}

impl Visitor for HeadersBuilder {
    type Output = Headers;

    fn visit_header(&mut self, name: &str, value: &str) {
        self.headers.set(name, value);
    }

    fn end_headers(&mut self) -> Skip {
        Skip(true)
    }

    fn handle_error(&mut self, error: GameError) {
        debug!("headers: {}", error);
    }

    fn result(self) -> Headers {
        self.headers
    }
}

/// Keeps the last mainline board.
#[derive(Default)]
pub struct BoardBuilder {
    board: Chess,
    depth: usize,
}

impl Visitor for BoardBuilder {
    type Output = Chess;

    fn visit_board(&mut self, board: &Chess) {
        if self.depth == 0 {
            self.board = board.clone();
        }
    }

    fn begin_variation(&mut self) {
        self.depth += 1;
    }

    fn end_variation(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn handle_error(&mut self, error: GameError) {
        debug!("board: {}", error);
    }

    fn result(self) -> Chess {
        self.board
    }
}

/// Skips whole games. The output is `true` once a game has been passed over.
#[derive(Default)]
pub struct SkipVisitor;

impl Visitor for SkipVisitor {
    type Output = bool;

    fn begin_game(&mut self) -> Skip {
        Skip(true)
    }

    fn handle_error(&mut self, error: GameError) {
        debug!("skip: {}", error);
    }

    fn result(self) -> bool {
        true
    }
}
