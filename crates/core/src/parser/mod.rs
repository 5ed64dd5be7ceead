//! PGN lexing and parsing

mod lexer;
mod pgn;
mod token;
mod visitor;

pub use lexer::{LexState, Lexer, DEFAULT_BUFSIZE, MIN_BUFSIZE};
pub use pgn::{parse_pgn_file, parse_pgn_string, Games, PgnError, PgnReader, ReaderConfig};
pub use token::{
    nag_for_symbol, Encoding, Token, TokenKind, TokenValue, NAG_BLUNDER, NAG_BRILLIANT_MOVE, NAG_DIAGRAM,
    NAG_DRAWISH_POSITION, NAG_DUBIOUS_MOVE, NAG_GOOD_MOVE, NAG_LIMIT, NAG_MISTAKE, NAG_NOVELTY, NAG_NULL,
    NAG_SPECULATIVE_MOVE, NAG_SYMBOLS, NAG_UNCLEAR_POSITION,
};
pub use visitor::{BoardBuilder, GameBuilder, HeadersBuilder, Skip, SkipVisitor, Visitor};
