//! Error types for pgn-analyzer-core

use std::fmt;

use thiserror::Error;

use crate::parser::TokenKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Invalid square index: {0}")]
    InvalidSquare(u32),

    #[error("Invalid FEN: {0}")]
    Fen(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Illegal position: {0}")]
    IllegalPosition(String),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Empty score list")]
    NoScores,

    #[error("Score list ({scores}) and variation list ({variations}) differ in length")]
    ScoreLengthMismatch { scores: usize, variations: usize },

    #[error("Unknown game node {0}")]
    UnknownNode(usize),

    #[error("No game #{0} in input")]
    GameNotFound(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal lexical error. Aborts the current `read_game` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("LEXER/{kind}: '{excerpt} ...' @ Line: {line}, Game {game}, Pos: {offset}")]
pub struct LexError {
    pub kind: LexErrorKind,
    /// Up to 20 characters of the offending input.
    pub excerpt: String,
    pub line: u32,
    pub game: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    IllegalCharacter,
    IllegalTagCharacter,
    IllegalCommentCharacter,
    NestedState,
    UnterminatedComment,
    UnterminatedTag,
    Io(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::IllegalCharacter => write!(f, "Illegal character"),
            LexErrorKind::IllegalTagCharacter => write!(f, "Illegal tag character"),
            LexErrorKind::IllegalCommentCharacter => write!(f, "Illegal comment character"),
            LexErrorKind::NestedState => write!(f, "Nested tag or comment"),
            LexErrorKind::UnterminatedComment => write!(f, "Comment not terminated"),
            LexErrorKind::UnterminatedTag => write!(f, "Tag not terminated"),
            LexErrorKind::Io(e) => write!(f, "Read failed ({})", e),
        }
    }
}

/// How a game body ended without its result marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    Eof,
    NewHeader,
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEnd::Eof => write!(f, "EOF"),
            GameEnd::NewHeader => write!(f, "new header"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The game's structure was damaged; parts of it may be missing.
    Parse,
    /// The structure is intact but the content is inconsistent.
    Semantic,
}

/// Recoverable per-game error, attached to the game instead of raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Parser: unexpected token {found} (expected {expected}) @ Line {line}, Game {game}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        line: u32,
        game: u32,
    },

    #[error("Parser: {expected} marker missing @ Line {line}, Game {game}")]
    MissingToken {
        expected: TokenKind,
        line: u32,
        game: u32,
    },

    #[error("Parser: game {game} ended by {end} before a result marker")]
    MissingResult { end: GameEnd, game: u32 },

    #[error("Parser: variation without a preceding move @ Line {line}, Game {game}")]
    VariationWithoutMove { line: u32, game: u32 },

    #[error("Parser: invalid FEN header '{fen}' ({reason})")]
    InvalidFen { fen: String, reason: String },

    #[error("Parser: Improper SAN {san} @ Line {line}, Game {game}, Pos {offset}")]
    IllegalSan {
        san: String,
        line: u32,
        game: u32,
        offset: u64,
    },

    #[error("Parser: endOfGame ({found}) != actual outcome ({actual})")]
    ResultMismatch { found: String, actual: String },

    #[error("Parser: game.headers['Result'] ({header}) != endOfGame ({result})")]
    HeaderResultMismatch { header: String, result: String },

    #[error("SkipBody: Parsing ended by EOF")]
    SkipEndedByEof,

    #[error("SkipBody: Parsing ended by new header")]
    SkipEndedByNewHeader,

    #[error("SkipBody: Parsing ended inside a comment")]
    SkipEndedInComment,
}

impl GameError {
    pub fn severity(&self) -> Severity {
        match self {
            GameError::IllegalSan { .. }
            | GameError::ResultMismatch { .. }
            | GameError::HeaderResultMismatch { .. } => Severity::Semantic,
            _ => Severity::Parse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = LexError {
            kind: LexErrorKind::IllegalCharacter,
            excerpt: "&&& 2. Nf3".to_string(),
            line: 3,
            game: 1,
            offset: 42,
        };
        assert_eq!(
            err.to_string(),
            "LEXER/Illegal character: '&&& 2. Nf3 ...' @ Line: 3, Game 1, Pos: 42"
        );
    }

    #[test]
    fn test_game_error_severity() {
        let san = GameError::IllegalSan {
            san: "Ke9".to_string(),
            line: 1,
            game: 1,
            offset: 0,
        };
        assert_eq!(san.severity(), Severity::Semantic);
        assert_eq!(GameError::SkipEndedByEof.severity(), Severity::Parse);
        let missing = GameError::MissingToken {
            expected: TokenKind::RParen,
            line: 2,
            game: 1,
        };
        assert_eq!(missing.severity(), Severity::Parse);
        assert!(missing.to_string().contains("RPAREN"));
    }
}
