//! PGN export

use shakmaty::{Chess, Color, Position};

use super::tree::{Game, NodeId};
use crate::error::Result;

pub const DEFAULT_LINE_WIDTH: usize = 80;

/// Writes games back to PGN text.
#[derive(Debug, Clone)]
pub struct PgnWriter {
    headers: bool,
    comments: bool,
    variations: bool,
    nags: bool,
    line_width: usize,
}

impl Default for PgnWriter {
    fn default() -> Self {
        Self {
            headers: true,
            comments: true,
            variations: true,
            nags: true,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl PgnWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_variations(mut self, variations: bool) -> Self {
        self.variations = variations;
        self
    }

    pub fn with_nags(mut self, nags: bool) -> Self {
        self.nags = nags;
        self
    }

    /// 0 disables wrapping.
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    pub fn write_game(&self, game: &Game) -> Result<String> {
        let mut out = String::new();
        if self.headers {
            for (name, value) in game.headers.iter() {
                out.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
            }
            out.push('\n');
        }

        let mut tokens = Vec::new();
        let root = game.root();
        let root_comment = &game.node(root).comment;
        if self.comments && !root_comment.is_empty() {
            tokens.push(comment_token(root_comment));
        }
        self.write_line(game, root, game.initial_board()?, &mut tokens, true)?;
        tokens.push(game.headers.result().to_string());

        out.push_str(&self.wrap(&tokens));
        out.push('\n');
        Ok(out)
    }

    fn write_line(
        &self,
        game: &Game,
        start: NodeId,
        mut position: Chess,
        out: &mut Vec<String>,
        mut force_number: bool,
    ) -> Result<()> {
        let mut current = start;
        while let Some((&main, variations)) = game.children(current).split_first() {
            self.write_ply(game, main, &position, out, force_number)?;
            force_number = self.comments && !game.node(main).comment.is_empty();

            if self.variations {
                for &variation in variations {
                    out.push("(".to_string());
                    self.write_ply(game, variation, &position, out, true)?;
                    let after = self.play(game, variation, &position)?;
                    let commented = self.comments && !game.node(variation).comment.is_empty();
                    self.write_line(game, variation, after, out, commented)?;
                    out.push(")".to_string());
                    force_number = true;
                }
            }

            position = self.play(game, main, &position)?;
            current = main;
        }
        Ok(())
    }

    fn play(&self, game: &Game, id: NodeId, position: &Chess) -> Result<Chess> {
        match &game.node(id).mv {
            Some(mv) => mv.play(position),
            None => Ok(position.clone()),
        }
    }

    fn write_ply(
        &self,
        game: &Game,
        id: NodeId,
        position: &Chess,
        out: &mut Vec<String>,
        mut force_number: bool,
    ) -> Result<()> {
        let node = game.node(id);
        if self.comments && !node.starting_comment.is_empty() {
            out.push(comment_token(&node.starting_comment));
            force_number = true;
        }
        let Some(mv) = &node.mv else {
            return Ok(());
        };
        let number = position.fullmoves();
        match position.turn() {
            Color::White => out.push(format!("{}.", number)),
            Color::Black if force_number => out.push(format!("{}...", number)),
            Color::Black => {}
        }
        out.push(mv.san(position));
        if self.nags {
            out.extend(node.nags.iter().filter(|&&n| n > 0).map(|n| format!("${}", n)));
        }
        if self.comments && !node.comment.is_empty() {
            out.push(comment_token(&node.comment));
        }
        Ok(())
    }

    fn wrap(&self, tokens: &[String]) -> String {
        let mut text = String::new();
        let mut line_len = 0;
        for token in tokens {
            if line_len > 0 {
                if self.line_width > 0 && line_len + 1 + token.len() > self.line_width {
                    text.push('\n');
                    line_len = 0;
                } else {
                    text.push(' ');
                    line_len += 1;
                }
            }
            text.push_str(token);
            line_len += token.len();
        }
        text
    }
}

impl Game {
    /// PGN text with every part included.
    pub fn to_pgn(&self) -> Result<String> {
        PgnWriter::default().write_game(self)
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn comment_token(comment: &str) -> String {
    format!("{{ {} }}", comment.replace('}', "").trim())
}
