//! PGN Analyzer Core Library
//!
//! A streaming PGN lexer and parser driving pluggable visitors, an arena
//! game tree, a bitboard position model for positional queries and an
//! annotator that turns engine scores into NAGs.

pub mod annotate;
pub mod board;
pub mod error;
pub mod game;
pub mod parser;
pub mod position;

pub use annotate::{AnnotationRule, Annotator, Score, ScoreSource};
pub use error::{Error, GameError, LexError, Result};
pub use game::{Game, Headers, NodeId, PlyMove};
pub use parser::{parse_pgn_file, parse_pgn_string, PgnReader, ReaderConfig, Visitor};
pub use position::{GamePhase, Position, PositionSummary, ScoreUnit};
