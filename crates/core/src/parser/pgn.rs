//! PGN file parsing functionality
//!
//! [`PgnReader`] pulls tokens from a [`Lexer`] and drives a [`Visitor`]
//! through one game at a time. Problems inside a game are reported through
//! [`Visitor::handle_error`] and parsing resumes at the next game; only
//! lexical errors abort a read.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use shakmaty::Chess;
use tracing::{debug, warn};

use super::lexer::{Lexer, DEFAULT_BUFSIZE};
use super::token::{Encoding, Token, TokenKind};
use super::visitor::{BoardBuilder, GameBuilder, HeadersBuilder, SkipVisitor, Visitor};
use crate::board;
use crate::error::{GameEnd, GameError, LexError, LexErrorKind};
use crate::game::{Game, Headers, PlyMove};

/// SAN text the lexer produces for every spelling of a null move.
const NULL_SAN: &str = "0000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    pub bufsize: usize,
    pub encoding: Encoding,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            bufsize: DEFAULT_BUFSIZE,
            encoding: Encoding::default(),
        }
    }
}

impl ReaderConfig {
    pub fn with_bufsize(mut self, bufsize: usize) -> Self {
        self.bufsize = bufsize;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Why a game body stopped early.
enum Halt {
    Lex(LexError),
    /// Recoverable error plus the token that triggered it, if any.
    Game(GameError, Option<Token>),
}

impl From<LexError> for Halt {
    fn from(error: LexError) -> Self {
        Halt::Lex(error)
    }
}

/// Board of the line being read and the board before its last move.
struct Line {
    board: Chess,
    before: Option<Chess>,
}

impl Line {
    fn new(board: Chess) -> Self {
        Self {
            board,
            before: None,
        }
    }

    fn push(&mut self, mv: &PlyMove) {
        let next = mv
            .play(&self.board)
            .unwrap_or_else(|_| board::play_null(&self.board));
        self.before = Some(std::mem::replace(&mut self.board, next));
    }
}

pub struct PgnReader<R> {
    lexer: Lexer<R>,
}

impl<R: Read> PgnReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ReaderConfig::default())
    }

    pub fn with_config(reader: R, config: ReaderConfig) -> Self {
        Self {
            lexer: Lexer::new(reader, config.bufsize, config.encoding),
        }
    }

    /// Continue with another stream.
    pub fn reset(&mut self, reader: R) {
        self.lexer.reset(reader);
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<R> {
        &mut self.lexer
    }

    /// Number of games started so far.
    pub fn games_read(&self) -> u32 {
        self.lexer.game()
    }

    pub fn read_game(&mut self) -> Result<Option<Game>, LexError> {
        self.read_with(GameBuilder::new())
    }

    pub fn read_headers(&mut self) -> Result<Option<Headers>, LexError> {
        self.read_with(HeadersBuilder::default())
    }

    /// Final mainline board of the next game.
    pub fn read_board(&mut self) -> Result<Option<Chess>, LexError> {
        self.read_with(BoardBuilder::default())
    }

    /// Passes over the next game. `false` at end of input.
    pub fn skip_game(&mut self) -> Result<bool, LexError> {
        Ok(self.read_with(SkipVisitor)?.unwrap_or(false))
    }

    pub fn games(&mut self) -> Games<'_, R> {
        Games {
            reader: self,
            done: false,
        }
    }

    /// Reads the next game into `visitor`. `None` at end of input.
    ///
    /// On a lexical error the lexer is moved to the next line starting with
    /// `[` before the error is returned, so the next call starts a new game.
    pub fn read_with<V: Visitor>(&mut self, visitor: V) -> Result<Option<V::Output>, LexError> {
        match self.read_inner(visitor) {
            Err(error) => {
                if !matches!(error.kind, LexErrorKind::Io(_)) {
                    if let Err(again) = self.lexer.recover() {
                        debug!("recovery failed: {}", again);
                    }
                }
                Err(error)
            }
            ok => ok,
        }
    }

    fn read_inner<V: Visitor>(&mut self, mut visitor: V) -> Result<Option<V::Output>, LexError> {
        let Some(first) = self.lexer.new_game()? else {
            return Ok(None);
        };
        let game = self.lexer.game();
        let mut skip = visitor.begin_game().0;
        let mut headers = visitor.begin_headers();

        let mut token = Some(first);
        while let Some(tag) = token.as_ref().filter(|t| t.is(TokenKind::TagName)) {
            let name = tag.text().to_string();
            let line = tag.line;
            match self.lexer.next_token()? {
                Some(value) if value.is(TokenKind::TagValue) => {
                    headers.set(&name, value.text());
                    visitor.visit_header(&name, value.text());
                    token = self.lexer.next_token()?;
                }
                other => {
                    visitor.handle_error(self.unexpected(TokenKind::TagValue, other.as_ref(), line));
                    token = other;
                }
            }
        }
        skip |= visitor.end_headers().0;
        let token = self.read_comments(&mut visitor, token)?;

        if skip {
            self.skip_rest(&mut visitor, token.as_ref(), true)?;
            return self.close(visitor);
        }

        let mut line = match headers.initial_board() {
            Ok(start) => Line::new(start),
            Err(e) => {
                visitor.handle_error(GameError::InvalidFen {
                    fen: headers.get("FEN").unwrap_or_default().to_string(),
                    reason: e.to_string(),
                });
                self.skip_rest(&mut visitor, token.as_ref(), false)?;
                return self.close(visitor);
            }
        };
        visitor.visit_board(&line.board);

        let mut semantic = None;
        match self.read_moves(&mut visitor, &mut line, token, &mut semantic) {
            Ok(end) => self.finish(&mut visitor, &headers, &line.board, end)?,
            Err(Halt::Lex(e)) => return Err(e),
            Err(Halt::Game(error, at)) => {
                debug!(game, "{}", error);
                visitor.handle_error(error);
                self.resync(at)?;
            }
        }
        if let Some(error) = semantic {
            visitor.handle_error(error);
        }
        self.close(visitor)
    }

    fn close<V: Visitor>(&mut self, mut visitor: V) -> Result<Option<V::Output>, LexError> {
        self.lexer.end_game()?;
        visitor.end_game();
        Ok(Some(visitor.result()))
    }

    /// Skips the body starting at `token`, which is handed back first.
    fn skip_rest<V: Visitor>(
        &mut self,
        visitor: &mut V,
        token: Option<&Token>,
        report: bool,
    ) -> Result<(), LexError> {
        if let Some(token) = token {
            self.lexer.rewind(token);
        }
        if let Some(error) = self.lexer.skip_body()? {
            if report {
                visitor.handle_error(error);
            }
        }
        Ok(())
    }

    /// Gets the lexer to the start of the next game after a parse error.
    fn resync(&mut self, at: Option<Token>) -> Result<(), LexError> {
        match at {
            Some(token) if token.is(TokenKind::TagName) => self.lexer.rewind(&token),
            Some(token) if token.is(TokenKind::EndOfGame) => {}
            _ => {
                self.lexer.skip_body()?;
            }
        }
        Ok(())
    }

    fn unexpected(&self, expected: TokenKind, found: Option<&Token>, line: u32) -> GameError {
        let game = self.lexer.game();
        match found {
            Some(token) => GameError::UnexpectedToken {
                expected,
                found: token.kind,
                line: token.line,
                game,
            },
            None => GameError::MissingToken {
                expected,
                line,
                game,
            },
        }
    }

    /// Joins consecutive comments and delivers them as one.
    fn read_comments<V: Visitor>(
        &mut self,
        visitor: &mut V,
        mut token: Option<Token>,
    ) -> Result<Option<Token>, LexError> {
        let mut text = String::new();
        let mut count = 0;
        while let Some(comment) = token.as_ref().filter(|t| t.is(TokenKind::Comment)) {
            if count > 0 {
                text.push('\n');
            }
            text.push_str(comment.text());
            count += 1;
            token = self.lexer.next_token()?;
        }
        let text = text.trim();
        if !text.is_empty() {
            visitor.visit_comment(text);
        }
        Ok(token)
    }

    /// Reads moves with their NAGs, comments and variations until a token
    /// that is not a move, which is returned.
    fn read_moves<V: Visitor>(
        &mut self,
        visitor: &mut V,
        line: &mut Line,
        mut token: Option<Token>,
        semantic: &mut Option<GameError>,
    ) -> Result<Option<Token>, Halt> {
        while let Some(san) = token.take() {
            if !san.is(TokenKind::SanPly) {
                token = Some(san);
                break;
            }
            let mv = if san.text() == NULL_SAN {
                PlyMove::Null
            } else {
                match board::resolve_san(&line.board, san.text()) {
                    Some(mv) => PlyMove::Played(mv),
                    None => {
                        warn!(game = self.lexer.game(), line = san.line, "illegal SAN {}", san.text());
                        if semantic.is_none() {
                            *semantic = Some(GameError::IllegalSan {
                                san: san.text().to_string(),
                                line: san.line,
                                game: self.lexer.game(),
                                offset: san.offset,
                            });
                        }
                        PlyMove::Null
                    }
                }
            };
            visitor.visit_move(&line.board, &mv);
            line.push(&mv);
            visitor.visit_board(&line.board);

            token = self.lexer.next_token()?;
            while let Some(nag) = token.as_ref().filter(|t| t.is(TokenKind::Nag)) {
                visitor.visit_nag(nag.nag());
                token = self.lexer.next_token()?;
            }
            token = self.read_comments(visitor, token)?;
            while token.as_ref().is_some_and(|t| t.is(TokenKind::LParen)) {
                token = self.read_variation(visitor, line, semantic)?;
                token = self.read_comments(visitor, token)?;
            }
        }
        Ok(token)
    }

    /// Reads one parenthesized alternative to the last move of `line`.
    fn read_variation<V: Visitor>(
        &mut self,
        visitor: &mut V,
        line: &Line,
        semantic: &mut Option<GameError>,
    ) -> Result<Option<Token>, Halt> {
        let opened = self.lexer.line();
        let Some(before) = line.before.clone() else {
            let error = GameError::VariationWithoutMove {
                line: opened,
                game: self.lexer.game(),
            };
            return Err(Halt::Game(error, None));
        };
        visitor.begin_variation();
        let mut variation = Line::new(before);
        let token = self.lexer.next_token()?;
        let token = self.read_comments(visitor, token)?;
        let token = self.read_moves(visitor, &mut variation, token, semantic)?;
        match token {
            Some(t) if t.is(TokenKind::RParen) => {}
            other => {
                let error = self.unexpected(TokenKind::RParen, other.as_ref(), opened);
                return Err(Halt::Game(error, other));
            }
        }
        visitor.end_variation();
        Ok(self.lexer.next_token()?)
    }

    /// Checks the token that ended the movetext against the final board and
    /// the Result header.
    fn finish<V: Visitor>(
        &mut self,
        visitor: &mut V,
        headers: &Headers,
        last: &Chess,
        end: Option<Token>,
    ) -> Result<(), LexError> {
        let game = self.lexer.game();
        let inferred = board::outcome_of(last);
        let missing = match end {
            Some(token) if token.is(TokenKind::EndOfGame) => {
                let marker = token.text();
                let result = inferred.unwrap_or(marker);
                visitor.visit_result(result);
                if let Some(actual) = inferred.filter(|&actual| actual != marker) {
                    visitor.handle_error(GameError::ResultMismatch {
                        found: marker.to_string(),
                        actual: actual.to_string(),
                    });
                }
                if headers.result() != result {
                    visitor.handle_error(GameError::HeaderResultMismatch {
                        header: headers.result().to_string(),
                        result: result.to_string(),
                    });
                }
                return Ok(());
            }
            Some(token) if token.is(TokenKind::TagName) => {
                self.lexer.rewind(&token);
                GameEnd::NewHeader
            }
            Some(token) => {
                visitor.handle_error(self.unexpected(TokenKind::EndOfGame, Some(&token), token.line));
                self.lexer.skip_body()?;
                return Ok(());
            }
            None => GameEnd::Eof,
        };
        if let Some(actual) = inferred {
            visitor.visit_result(actual);
        }
        visitor.handle_error(GameError::MissingResult { end: missing, game });
        Ok(())
    }
}

/// Iterator over the games of a reader. Stops at end of input or on an I/O
/// failure; other lexical errors are yielded and reading continues.
pub struct Games<'a, R> {
    reader: &'a mut PgnReader<R>,
    done: bool,
}

impl<R: Read> Iterator for Games<'_, R> {
    type Item = Result<Game, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_game() {
            Ok(Some(game)) => Some(Ok(game)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                if matches!(e.kind, LexErrorKind::Io(_)) {
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("File error: {0}")]
    FileError(#[from] io::Error),
    #[error("No valid games found in PGN")]
    NoGamesFound,
}

pub fn parse_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<Game>, PgnError> {
    let file = File::open(path)?;
    collect_games(PgnReader::new(file))
}

pub fn parse_pgn_string(pgn: &str) -> Result<Vec<Game>, PgnError> {
    collect_games(PgnReader::new(Cursor::new(pgn.as_bytes())))
}

fn collect_games<R: Read>(mut reader: PgnReader<R>) -> Result<Vec<Game>, PgnError> {
    let mut games: Vec<Game> = Vec::new();
    for (index, game) in reader.games().enumerate() {
        match game {
            Ok(game) => games.push(game),
            Err(e) => warn!("failed to load game #{}: {}", index + 1, e),
        }
    }

    if games.is_empty() {
        Err(PgnError::NoGamesFound)
    } else {
        Ok(games)
    }
}
