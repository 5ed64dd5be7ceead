//! Tokens produced by the PGN lexer

use std::fmt;

pub const NAG_NULL: u16 = 0;
pub const NAG_GOOD_MOVE: u16 = 1;
pub const NAG_MISTAKE: u16 = 2;
pub const NAG_BRILLIANT_MOVE: u16 = 3;
pub const NAG_BLUNDER: u16 = 4;
pub const NAG_SPECULATIVE_MOVE: u16 = 5;
pub const NAG_DUBIOUS_MOVE: u16 = 6;
pub const NAG_DRAWISH_POSITION: u16 = 10;
pub const NAG_UNCLEAR_POSITION: u16 = 13;
pub const NAG_NOVELTY: u16 = 146;
pub const NAG_DIAGRAM: u16 = 220;

/// `$n` values at or above this limit are not standard glyphs.
pub const NAG_LIMIT: u16 = 140;

/// Symbol to NAG code table for the shorthand glyphs.
pub const NAG_SYMBOLS: [(&str, u16); 18] = [
    ("?", NAG_MISTAKE),
    ("??", NAG_BLUNDER),
    ("?!", NAG_DUBIOUS_MOVE),
    ("!", NAG_GOOD_MOVE),
    ("!!", NAG_BRILLIANT_MOVE),
    ("!?", NAG_SPECULATIVE_MOVE),
    ("+=", 14),
    ("=+", 15),
    ("+/-", 16),
    ("+-", 18),
    ("+--", 20),
    ("-/+", 17),
    ("-+", 19),
    ("--+", 21),
    ("=", NAG_DRAWISH_POSITION),
    ("~", NAG_UNCLEAR_POSITION),
    ("N", NAG_NOVELTY),
    ("D", NAG_DIAGRAM),
];

pub fn nag_for_symbol(symbol: &str) -> Option<u16> {
    NAG_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, code)| *code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    TagName,
    TagValue,
    EndOfGame,
    MoveNumber,
    SanPly,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    Nag,
    Comment,
    LineComment,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::TagName => "TAGNAME",
            TokenKind::TagValue => "TAGVALUE",
            TokenKind::EndOfGame => "ENDOFGAME",
            TokenKind::MoveNumber => "MOVENUMBER",
            TokenKind::SanPly => "SANPLY",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LBrack => "LBRACK",
            TokenKind::RBrack => "RBRACK",
            TokenKind::Nag => "NAG",
            TokenKind::Comment => "COMMENT",
            TokenKind::LineComment => "LINECOMMENT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
    None,
    Text(String),
    Nag(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub line: u32,
    /// Absolute byte offset of the token in the stream.
    pub offset: u64,
}

impl Token {
    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Text(s) => s,
            _ => "",
        }
    }

    pub fn nag(&self) -> u16 {
        match self.value {
            TokenValue::Nag(n) => n,
            _ => NAG_NULL,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::None => write!(f, "{} @ {}:{}", self.kind, self.line, self.offset),
            TokenValue::Text(s) => write!(f, "{}({:?}) @ {}:{}", self.kind, s, self.line, self.offset),
            TokenValue::Nag(n) => write!(f, "{}(${}) @ {}:{}", self.kind, n, self.line, self.offset),
        }
    }
}

/// Text encoding used to decode tag values and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }
}
