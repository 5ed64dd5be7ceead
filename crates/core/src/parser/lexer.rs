//! Streaming PGN lexer
//!
//! The lexer owns a refillable byte buffer over any `Read` source and hands
//! out one token at a time. Brackets, braces, move numbers and line comments
//! only switch state or are dropped; everything else becomes a [`Token`].

use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use super::token::{nag_for_symbol, Encoding, Token, TokenKind, TokenValue, NAG_LIMIT, NAG_NULL};
use crate::error::{GameError, LexError, LexErrorKind};

pub const DEFAULT_BUFSIZE: usize = 1 << 20;
pub const MIN_BUFSIZE: usize = 4096;

const BOM: &[u8] = b"\xef\xbb\xbf";
const LOOKAHEAD: usize = 64;
const EXCERPT_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Initial,
    InComment,
    InTag,
}

pub struct Lexer<R> {
    reader: R,
    encoding: Encoding,
    bufsize: usize,
    buf: Vec<u8>,
    pos: usize,
    /// Stream offset of `buf[0]`.
    base: u64,
    exhausted: bool,
    primed: bool,
    line: u32,
    game: u32,
    state: LexState,
    /// Buffer index and line of the `[` that opened the current tag.
    tag_start: Option<(usize, u32)>,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R, bufsize: usize, encoding: Encoding) -> Self {
        Self {
            reader,
            encoding,
            bufsize: bufsize.max(MIN_BUFSIZE),
            buf: Vec::new(),
            pos: 0,
            base: 0,
            exhausted: false,
            primed: false,
            line: 1,
            game: 0,
            state: LexState::Initial,
            tag_start: None,
        }
    }

    /// Switch to another stream. Counters start over.
    pub fn reset(&mut self, reader: R) {
        self.reader = reader;
        self.buf.clear();
        self.pos = 0;
        self.base = 0;
        self.exhausted = false;
        self.primed = false;
        self.line = 1;
        self.game = 0;
        self.state = LexState::Initial;
        self.tag_start = None;
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn game(&self) -> u32 {
        self.game
    }

    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    pub fn state(&self) -> LexState {
        self.state
    }

    pub fn bufsize(&self) -> usize {
        self.bufsize
    }

    /// Starts the next game and returns its first token.
    pub fn new_game(&mut self) -> Result<Option<Token>, LexError> {
        if !self.primed {
            self.primed = true;
            self.line = 1;
            self.game = 0;
            self.fill()?;
            if self.buf.starts_with(BOM) {
                self.pos = BOM.len();
            }
        }
        self.state = LexState::Initial;
        self.tag_start = None;
        self.game += 1;
        let first = self.next_token()?;
        if first.is_none() {
            self.game -= 1;
        }
        Ok(first)
    }

    /// Drops consumed input and tops the buffer up for the next game.
    pub fn end_game(&mut self) -> Result<(), LexError> {
        self.compact();
        self.refill_check()
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.refill_check()?;
        loop {
            self.ensure(LOOKAHEAD)?;
            let Some(c) = self.peek(0) else {
                return match self.state {
                    LexState::Initial => Ok(None),
                    LexState::InComment => Err(self.error(LexErrorKind::UnterminatedComment)),
                    LexState::InTag => Err(self.error(LexErrorKind::UnterminatedTag)),
                };
            };
            let token = match self.state {
                LexState::Initial => self.scan_initial(c)?,
                LexState::InTag => self.scan_tag(c)?,
                LexState::InComment => self.scan_comment(c)?,
            };
            if token.is_some() {
                return Ok(token);
            }
        }
    }

    /// All remaining tokens of the current game, up to and including its result.
    pub fn dump(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            let done = token.is(TokenKind::EndOfGame);
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    /// Hands a token back so the next `next_token` call yields it again.
    ///
    /// Only tokens lexed in the initial state can be handed back; a tag name
    /// rewinds to the `[` that opened its tag.
    pub fn rewind(&mut self, token: &Token) {
        match (token.kind, self.tag_start.take()) {
            (TokenKind::TagName, Some((start, line))) => {
                self.pos = start;
                self.line = line;
            }
            _ => {
                if let Some(start) = token.offset.checked_sub(self.base) {
                    self.pos = (start as usize).min(self.buf.len());
                    self.line = token.line;
                }
            }
        }
        self.state = LexState::Initial;
    }

    /// Moves past a lexical error to the next line starting with `[`.
    pub fn recover(&mut self) -> Result<(), LexError> {
        self.state = LexState::Initial;
        self.tag_start = None;
        self.pos = (self.pos + 1).min(self.buf.len());
        loop {
            if let Some(i) = self.buf[self.pos..].iter().position(|&b| b == b'\n') {
                self.pos += i + 1;
                self.line += 1;
                self.ensure(1)?;
                if self.peek(0) == Some(b'[') {
                    break;
                }
                continue;
            }
            if self.exhausted {
                self.pos = self.buf.len();
                break;
            }
            self.compact();
            self.fill()?;
        }
        debug!(line = self.line, offset = self.offset(), "lexer resynchronized");
        Ok(())
    }

    /// Skips the rest of a game body without tokenizing it.
    ///
    /// Returns `None` when a result marker was consumed. Otherwise the error
    /// says why the scan stopped; the cursor is left where the next game can
    /// start in either case.
    pub fn skip_body(&mut self) -> Result<Option<GameError>, LexError> {
        self.state = LexState::Initial;
        self.tag_start = None;
        loop {
            self.ensure(LOOKAHEAD)?;
            let Some(c) = self.peek(0) else {
                return Ok(Some(GameError::SkipEndedByEof));
            };
            match c {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b'[' => return Ok(Some(GameError::SkipEndedByNewHeader)),
                b'{' => {
                    if !self.skip_past(b'}')? {
                        return Ok(Some(GameError::SkipEndedInComment));
                    }
                }
                b';' => self.skip_line_comment()?,
                _ => match match_result(&self.buf[self.pos..]) {
                    Some(n) => {
                        self.pos += n;
                        return Ok(None);
                    }
                    None => self.pos += 1,
                },
            }
        }
    }

    fn scan_initial(&mut self, c: u8) -> Result<Option<Token>, LexError> {
        let start = self.pos;
        let line = self.line;
        match c {
            b' ' | b'\t' | b'\x0c' | b'\r' => {
                self.pos += 1;
                return Ok(None);
            }
            b'\n' => {
                self.line += 1;
                self.pos += 1;
                return Ok(None);
            }
            b'[' => {
                self.tag_start = Some((start, line));
                self.enter(LexState::InTag)?;
                return Ok(None);
            }
            b'{' => {
                self.enter(LexState::InComment)?;
                return Ok(None);
            }
            b';' => {
                self.skip_line_comment()?;
                return Ok(None);
            }
            b'(' => {
                self.pos += 1;
                return Ok(Some(self.token(TokenKind::LParen, TokenValue::None, start, line)));
            }
            b')' => {
                self.pos += 1;
                return Ok(Some(self.token(TokenKind::RParen, TokenValue::None, start, line)));
            }
            _ => {}
        }

        let rest = &self.buf[self.pos..];
        if let Some(n) = match_result(rest) {
            let text = String::from_utf8_lossy(&rest[..n]).into_owned();
            self.pos += n;
            return Ok(Some(self.token(TokenKind::EndOfGame, TokenValue::Text(text), start, line)));
        }
        if let Some((n, san)) = match_san(rest) {
            self.pos += n;
            return Ok(Some(self.token(TokenKind::SanPly, TokenValue::Text(san), start, line)));
        }
        if let Some(n) = match_move_number(rest) {
            self.pos += n;
            return Ok(None);
        }
        if let Some((n, symbol)) = match_nag(rest) {
            let code = self.nag_code(&symbol);
            self.pos += n;
            return Ok(Some(self.token(TokenKind::Nag, TokenValue::Nag(code), start, line)));
        }
        Err(self.error(LexErrorKind::IllegalCharacter))
    }

    fn scan_tag(&mut self, c: u8) -> Result<Option<Token>, LexError> {
        let start = self.pos;
        let line = self.line;
        match c {
            b' ' | b'\t' | b'\x0c' | b'\r' => {
                self.pos += 1;
                Ok(None)
            }
            b'\n' => {
                self.line += 1;
                self.pos += 1;
                Ok(None)
            }
            b']' => {
                self.pos += 1;
                self.state = LexState::Initial;
                self.tag_start = None;
                Ok(None)
            }
            b';' => {
                self.skip_line_comment()?;
                Ok(None)
            }
            b'[' | b'{' => Err(self.error(LexErrorKind::NestedState)),
            b'A'..=b'Z' => {
                let n = 1 + self.buf[self.pos + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric())
                    .count();
                let name = String::from_utf8_lossy(&self.buf[start..start + n]).into_owned();
                self.pos += n;
                Ok(Some(self.token(TokenKind::TagName, TokenValue::Text(name), start, line)))
            }
            b'"' => {
                let end = loop {
                    if let Some(end) = closing_quote(&self.buf[start + 1..]) {
                        break start + 1 + end;
                    }
                    if self.exhausted {
                        return Err(self.error(LexErrorKind::UnterminatedTag));
                    }
                    self.fill()?;
                };
                let value = unescape(&self.encoding.decode(&self.buf[start + 1..end]));
                self.pos = end + 1;
                Ok(Some(self.token(TokenKind::TagValue, TokenValue::Text(value), start, line)))
            }
            _ => Err(self.error(LexErrorKind::IllegalTagCharacter)),
        }
    }

    fn scan_comment(&mut self, c: u8) -> Result<Option<Token>, LexError> {
        match c {
            b'}' => {
                self.pos += 1;
                self.state = LexState::Initial;
                Ok(None)
            }
            b'{' => Err(self.error(LexErrorKind::IllegalCommentCharacter)),
            _ => {
                let start = self.pos;
                let line = self.line;
                let end = loop {
                    if let Some(i) = self.buf[start..].iter().position(|&b| b == b'{' || b == b'}') {
                        break start + i;
                    }
                    if self.exhausted {
                        break self.buf.len();
                    }
                    self.fill()?;
                };
                let raw = &self.buf[start..end];
                self.line += raw.iter().filter(|&&b| b == b'\n').count() as u32;
                let text: String = self.encoding.decode(raw).chars().filter(|&ch| ch != '\r').collect();
                self.pos = end;
                Ok(Some(self.token(TokenKind::Comment, TokenValue::Text(text), start, line)))
            }
        }
    }

    fn enter(&mut self, state: LexState) -> Result<(), LexError> {
        if self.state != LexState::Initial {
            return Err(self.error(LexErrorKind::NestedState));
        }
        self.state = state;
        self.pos += 1;
        Ok(())
    }

    /// Leaves the cursor on the terminating newline.
    fn skip_line_comment(&mut self) -> Result<(), LexError> {
        loop {
            if let Some(i) = self.buf[self.pos..].iter().position(|&b| b == b'\n') {
                self.pos += i;
                return Ok(());
            }
            if self.exhausted {
                self.pos = self.buf.len();
                return Ok(());
            }
            self.fill()?;
        }
    }

    /// Consumes through the next `close` byte; false if the input ran out first.
    fn skip_past(&mut self, close: u8) -> Result<bool, LexError> {
        loop {
            if let Some(i) = self.buf[self.pos..].iter().position(|&b| b == close) {
                let skipped = &self.buf[self.pos..self.pos + i];
                self.line += skipped.iter().filter(|&&b| b == b'\n').count() as u32;
                self.pos += i + 1;
                return Ok(true);
            }
            if self.exhausted {
                let skipped = &self.buf[self.pos..];
                self.line += skipped.iter().filter(|&&b| b == b'\n').count() as u32;
                self.pos = self.buf.len();
                return Ok(false);
            }
            self.fill()?;
        }
    }

    fn nag_code(&self, symbol: &str) -> u16 {
        let code = match symbol.strip_prefix('$') {
            Some(digits) => digits.parse::<u16>().ok().filter(|n| *n < NAG_LIMIT),
            None => nag_for_symbol(symbol),
        };
        code.unwrap_or_else(|| {
            warn!(line = self.line, game = self.game, "LEXER/Unknown NAG '{}', using $0", symbol);
            NAG_NULL
        })
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.buf.get(self.pos + ahead).copied()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn token(&self, kind: TokenKind, value: TokenValue, start: usize, line: u32) -> Token {
        Token {
            kind,
            value,
            line,
            offset: self.base + start as u64,
        }
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        let end = (self.pos + EXCERPT_LEN).min(self.buf.len());
        let excerpt = String::from_utf8_lossy(&self.buf[self.pos.min(end)..end]).into_owned();
        LexError {
            kind,
            excerpt,
            line: self.line,
            game: self.game,
            offset: self.offset(),
        }
    }

    fn refill_check(&mut self) -> Result<(), LexError> {
        if !self.exhausted && self.remaining() < self.bufsize / 4 {
            self.compact();
            self.fill()?;
        }
        Ok(())
    }

    /// Makes at least `n` bytes visible unless the stream is exhausted.
    fn ensure(&mut self, n: usize) -> Result<(), LexError> {
        while !self.exhausted && self.remaining() < n {
            self.compact();
            self.fill()?;
        }
        Ok(())
    }

    fn compact(&mut self) {
        let keep = match self.tag_start {
            Some((start, _)) => start.min(self.pos),
            None => self.pos,
        };
        if keep == 0 {
            return;
        }
        self.buf.drain(..keep);
        self.pos -= keep;
        self.base += keep as u64;
        if let Some((start, line)) = self.tag_start {
            self.tag_start = Some((start - keep, line));
        }
    }

    fn fill(&mut self) -> Result<usize, LexError> {
        if self.exhausted {
            return Ok(0);
        }
        let old = self.buf.len();
        self.buf.resize(old + self.bufsize, 0);
        let mut read = 0;
        while read < self.bufsize {
            match self.reader.read(&mut self.buf[old + read..]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(old + read);
                    return Err(self.error(LexErrorKind::Io(e.to_string())));
                }
            }
        }
        self.buf.truncate(old + read);
        debug!(bytes = read, offset = self.base + old as u64, "lexer buffer refilled");
        Ok(read)
    }
}

/// Length of a result marker at the start of `s`.
pub(crate) fn match_result(s: &[u8]) -> Option<usize> {
    [&b"1/2-1/2"[..], b"1-0", b"0-1", b"*"]
        .into_iter()
        .find(|marker| s.starts_with(marker))
        .map(<[u8]>::len)
}

/// Matches a SAN move, castling or null move. Returns the consumed length and
/// the normalized move text.
pub(crate) fn match_san(s: &[u8]) -> Option<(usize, String)> {
    for (long, short, text) in [
        (&b"O-O-O"[..], &b"O-O"[..], ("O-O-O", "O-O")),
        (b"0-0-0", b"0-0", ("O-O-O", "O-O")),
    ] {
        let (n, value) = if s.starts_with(long) {
            (long.len(), text.0)
        } else if s.starts_with(short) {
            (short.len(), text.1)
        } else {
            continue;
        };
        let n = n + usize::from(matches!(s.get(n), Some(b'+' | b'#')));
        return Some((n, value.to_string()));
    }
    for null in [&b"0000"[..], b"@@@@", b"Z0"] {
        if s.starts_with(null) {
            return Some((null.len(), "0000".to_string()));
        }
    }
    if s.starts_with(b"--") && !matches!(s.get(2), Some(b'+' | b'-')) {
        return Some((2, "0000".to_string()));
    }
    match_piece_move(s)
}

fn match_piece_move(s: &[u8]) -> Option<(usize, String)> {
    let is_file = |b: Option<&u8>| matches!(b, Some(b'a'..=b'h'));
    let is_rank = |b: Option<&u8>| matches!(b, Some(b'1'..=b'8'));

    let piece = usize::from(matches!(s.first(), Some(b'N' | b'B' | b'K' | b'R' | b'Q')));
    for (take_file, take_rank) in [(true, true), (true, false), (false, true), (false, false)] {
        let mut j = piece;
        if take_file {
            if !is_file(s.get(j)) {
                continue;
            }
            j += 1;
        }
        if take_rank {
            if !is_rank(s.get(j)) {
                continue;
            }
            j += 1;
        }
        if matches!(s.get(j), Some(b'x' | b':')) {
            j += 1;
        }
        if !(is_file(s.get(j)) && is_rank(s.get(j + 1))) {
            continue;
        }
        let target_rank = s[j + 1];
        j += 2;

        let mut text: String = s[..j]
            .iter()
            .filter(|&&b| b != b'x' && b != b':')
            .map(|&b| b as char)
            .collect();
        let promotes = piece == 0 && (target_rank == b'1' || target_rank == b'8');
        if s.get(j) == Some(&b'=') && matches!(s.get(j + 1), Some(b'Q' | b'R' | b'B' | b'N')) {
            text.push('=');
            text.push(s[j + 1] as char);
            j += 2;
        } else if promotes && matches!(s.get(j), Some(b'Q' | b'R' | b'B' | b'N')) {
            text.push('=');
            text.push(s[j] as char);
            j += 1;
        }
        if matches!(s.get(j), Some(b'+' | b'#')) {
            j += 1;
        }
        return Some((j, text));
    }
    None
}

fn match_move_number(s: &[u8]) -> Option<usize> {
    let n = match s.first() {
        Some(b'1'..=b'9') => {
            let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
            digits + s[digits..].iter().take_while(|&&b| b == b'.').count()
        }
        Some(b'.') => s.iter().take_while(|&&b| b == b'.').count(),
        _ => return None,
    };
    if s.get(n) == Some(&b'-') {
        return None;
    }
    Some(n)
}

/// Matches a NAG in numeric or symbolic form and returns its raw text.
pub(crate) fn match_nag(s: &[u8]) -> Option<(usize, String)> {
    let text = |n: usize| String::from_utf8_lossy(&s[..n]).into_owned();

    if s.first() == Some(&b'$') {
        let digits = s[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if (1..=3).contains(&digits) && s[1] != b'0' {
            return Some((1 + digits, text(1 + digits)));
        }
        return None;
    }
    for symbol in ["--+", "+--", "-/+", "+/-", "-+", "+-", "+=", "=+"] {
        if s.starts_with(symbol.as_bytes()) && !matches!(s.get(symbol.len()), Some(b'=' | b'+' | b'-')) {
            return Some((symbol.len(), symbol.to_string()));
        }
    }
    for symbol in ["??", "?!", "!!", "!?"] {
        if s.starts_with(symbol.as_bytes()) && !matches!(s.get(2), Some(b'?' | b'!')) {
            return Some((2, symbol.to_string()));
        }
    }
    let single = |b: Option<&u8>| matches!(b, Some(b'?' | b'!' | b'=' | b'~' | b'D' | b'N'));
    if single(s.first()) && !single(s.get(1)) {
        return Some((1, text(1)));
    }
    None
}

fn closing_quote(s: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < s.len() {
        match s[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push(c);
                    out.push(next);
                }
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lexer(text: &str) -> Lexer<Cursor<Vec<u8>>> {
        Lexer::new(Cursor::new(text.as_bytes().to_vec()), MIN_BUFSIZE, Encoding::Utf8)
    }

    fn tokens(text: &str) -> Vec<Token> {
        let mut lex = lexer(text);
        let mut out = Vec::new();
        let mut next = lex.new_game().unwrap();
        while let Some(token) = next {
            out.push(token);
            next = lex.next_token().unwrap();
        }
        out
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokens(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tags_and_movetext() {
        let toks = tokens("[Event \"Casual\"]\n[White \"A \\\"B\\\" C\"]\n\n1. e4 e5 2. Nf3 1-0");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TagName,
                TokenKind::TagValue,
                TokenKind::TagName,
                TokenKind::TagValue,
                TokenKind::SanPly,
                TokenKind::SanPly,
                TokenKind::SanPly,
                TokenKind::EndOfGame,
            ]
        );
        assert_eq!(toks[0].text(), "Event");
        assert_eq!(toks[3].text(), "A \"B\" C");
        assert_eq!(toks[6].text(), "Nf3");
        assert_eq!(toks[6].line, 4);
        assert_eq!(toks[7].text(), "1-0");
    }

    #[test]
    fn test_every_nag_symbol_maps_to_its_code() {
        for (symbol, code) in crate::parser::token::NAG_SYMBOLS {
            let toks = tokens(symbol);
            assert_eq!(toks.len(), 1, "symbol {}", symbol);
            assert_eq!(toks[0].kind, TokenKind::Nag);
            assert_eq!(toks[0].nag(), code, "symbol {}", symbol);
        }
    }

    #[test]
    fn test_unknown_numeric_nag_becomes_zero() {
        let toks = tokens("e4 $999 $7 $139 $140");
        let nags: Vec<u16> = toks.iter().filter(|t| t.is(TokenKind::Nag)).map(Token::nag).collect();
        assert_eq!(nags, vec![0, 7, 139, 0]);
    }

    #[test]
    fn test_san_normalization() {
        let cases = [
            ("exd5", "ed5"),
            ("Nbxd7+", "Nbd7"),
            ("Qh4xe1#", "Qh4e1"),
            ("e8=Q+", "e8=Q"),
            ("e8Q", "e8=Q"),
            ("O-O-O+", "O-O-O"),
            ("0-0", "O-O"),
            ("@@@@", "0000"),
            ("Z0", "0000"),
            ("--", "0000"),
            ("0000", "0000"),
            ("R1e2", "R1e2"),
        ];
        for (input, expected) in cases {
            let toks = tokens(input);
            assert_eq!(toks.len(), 1, "input {}", input);
            assert_eq!(toks[0].kind, TokenKind::SanPly, "input {}", input);
            assert_eq!(toks[0].text(), expected, "input {}", input);
        }
    }

    #[test]
    fn test_results_win_over_move_numbers() {
        assert_eq!(kinds("1/2-1/2"), vec![TokenKind::EndOfGame]);
        assert_eq!(kinds("0-1"), vec![TokenKind::EndOfGame]);
        assert_eq!(kinds("*"), vec![TokenKind::EndOfGame]);
        assert_eq!(kinds("12. e4 12... e5"), vec![TokenKind::SanPly, TokenKind::SanPly]);
    }

    #[test]
    fn test_null_move_followed_by_nag() {
        assert_eq!(kinds("--+"), vec![TokenKind::Nag]);
        assert_eq!(kinds("-- +-"), vec![TokenKind::SanPly, TokenKind::Nag]);
    }

    #[test]
    fn test_comments_and_variations() {
        let toks = tokens("1. e4 {best\nby test} (1. d4 ; line comment\n) e5 *");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::SanPly,
                TokenKind::Comment,
                TokenKind::LParen,
                TokenKind::SanPly,
                TokenKind::RParen,
                TokenKind::SanPly,
                TokenKind::EndOfGame,
            ]
        );
        assert_eq!(toks[1].text(), "best\nby test");
        assert_eq!(toks[4].line, 3);
    }

    #[test]
    fn test_bom_is_stripped() {
        let toks = tokens("\u{feff}[Event \"x\"]");
        assert_eq!(toks[0].text(), "Event");
        assert_eq!(toks[0].offset, 4);
    }

    #[test]
    fn test_illegal_character_is_fatal() {
        let mut lex = lexer("1. e4 & e5");
        assert!(lex.new_game().unwrap().is_some());
        let err = lex.next_token().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalCharacter);
        assert_eq!(err.game, 1);
        assert_eq!(err.offset, 6);
        assert!(err.to_string().starts_with("LEXER/Illegal character: '& e5 ...'"));
    }

    #[test]
    fn test_nested_states_are_rejected() {
        let mut lex = lexer("{ outer { inner } }");
        let err = lex.new_game().and_then(|_| lex.next_token()).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalCommentCharacter);

        let mut lex = lexer("[Event [");
        let err = lex.new_game().and_then(|_| lex.next_token()).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::NestedState);
    }

    #[test]
    fn test_unterminated_comment_at_eof() {
        let mut lex = lexer("e4 { never closed");
        assert!(lex.new_game().unwrap().is_some());
        assert_eq!(lex.next_token().unwrap().unwrap().kind, TokenKind::Comment);
        let err = lex.next_token().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_rewind_tag_name() {
        let mut lex = lexer("e4 *\n[Event \"next\"]");
        lex.new_game().unwrap();
        lex.next_token().unwrap();
        let tag = lex.next_token().unwrap().unwrap();
        assert_eq!(tag.kind, TokenKind::TagName);
        lex.rewind(&tag);
        assert_eq!(lex.state(), LexState::Initial);
        let again = lex.new_game().unwrap().unwrap();
        assert_eq!(again.text(), "Event");
        assert_eq!(lex.game(), 2);
    }

    #[test]
    fn test_tokens_survive_buffer_boundaries() {
        let comment = "x".repeat(MIN_BUFSIZE * 3);
        let text = format!("1. e4 {{{}}} e5 {}", comment, "*");
        let toks = tokens(&text);
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[1].text().len(), comment.len());
        assert_eq!(toks[2].text(), "e5");
    }

    #[test]
    fn test_skip_body_stops_at_result() {
        let mut lex = lexer("e4 {1-0 inside} ; 0-1 here\n e5 1/2-1/2[Event \"b\"]");
        assert!(lex.new_game().unwrap().is_some());
        assert_eq!(lex.skip_body().unwrap(), None);
        let next = lex.new_game().unwrap().unwrap();
        assert_eq!(next.text(), "Event");
    }

    #[test]
    fn test_skip_body_reports_new_header_and_eof() {
        let mut lex = lexer("e4 e5\n[Event \"b\"]\n");
        lex.new_game().unwrap();
        assert_eq!(lex.skip_body().unwrap(), Some(GameError::SkipEndedByNewHeader));
        assert_eq!(lex.new_game().unwrap().unwrap().text(), "Event");

        let mut lex = lexer("e4 e5 Nf3");
        lex.new_game().unwrap();
        assert_eq!(lex.skip_body().unwrap(), Some(GameError::SkipEndedByEof));

        let mut lex = lexer("e4 { open");
        lex.new_game().unwrap();
        assert_eq!(lex.skip_body().unwrap(), Some(GameError::SkipEndedInComment));
    }

    #[test]
    fn test_recover_finds_next_header() {
        let mut lex = lexer("1. e4 & junk\nmore junk\n[Event \"ok\"]\n*");
        lex.new_game().unwrap();
        assert!(lex.next_token().is_err());
        lex.recover().unwrap();
        assert_eq!(lex.line(), 3);
        assert_eq!(lex.new_game().unwrap().unwrap().text(), "Event");
    }

    #[test]
    fn test_dump_stops_after_result() {
        let mut lex = lexer("e4 e5 * d4");
        let first = lex.new_game().unwrap().unwrap();
        assert_eq!(first.text(), "e4");
        let rest = lex.dump().unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].kind, TokenKind::EndOfGame);
    }
}
