//! Bitboard position model for positional analysis
//!
//! A [`Position`] wraps a [`Setup`] and keeps per-color, per-role bitboards
//! derived from it. Every mutation goes through one entry point that rebuilds
//! the bitboards and drops the cached pin and bad-bishop sets, so queries
//! never see stale state.

mod analysis;
mod rays;
mod summary;
mod tables;

use std::cell::Cell;
use std::fmt;

use serde::Serialize;
use shakmaty::{Bitboard, Board, Chess, Color, EnPassantMode, Move, Piece, Position as _, Role, Setup, Square};

use crate::board;
use crate::error::{Error, Result};

pub use rays::{area, find_nn, north_fill, restricted_ray, shift, south_fill, RayTables};
pub use summary::{Feature, Polarity, PositionSummary};
pub use tables::{material_value, square_value, MAX_NON_PAWN_SCORE};

pub const EMPTY_FEN: &str = "8/8/8/8/8/8/8/8 w - - 0 1";

/// Scale used by [`winning_probability`](Position::winning_probability).
pub const DEFAULT_K: f64 = 4.0;

const ROLES: [Role; 6] = [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen, Role::King];
const ALL: usize = 6;

fn color_index(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

fn role_index(role: Role) -> usize {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    MiddleGame,
    EndGame,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Opening => write!(f, "opening"),
            GamePhase::MiddleGame => write!(f, "middle game"),
            GamePhase::EndGame => write!(f, "end game"),
        }
    }
}

/// Units used when scores leave the model. Internally everything is
/// centipawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreUnit {
    #[default]
    Centipawns,
    Pawns,
}

impl ScoreUnit {
    pub fn scale(self, centipawns: i32) -> f64 {
        match self {
            ScoreUnit::Centipawns => f64::from(centipawns),
            ScoreUnit::Pawns => f64::from(centipawns) * 0.01,
        }
    }
}

/// Piece counts per role. Also used for signed balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MaterialCount {
    pub pawns: i32,
    pub knights: i32,
    pub bishops: i32,
    pub rooks: i32,
    pub queens: i32,
    pub kings: i32,
}

impl MaterialCount {
    pub fn get(&self, role: Role) -> i32 {
        match role {
            Role::Pawn => self.pawns,
            Role::Knight => self.knights,
            Role::Bishop => self.bishops,
            Role::Rook => self.rooks,
            Role::Queen => self.queens,
            Role::King => self.kings,
        }
    }

    fn get_mut(&mut self, role: Role) -> &mut i32 {
        match role {
            Role::Pawn => &mut self.pawns,
            Role::Knight => &mut self.knights,
            Role::Bishop => &mut self.bishops,
            Role::Rook => &mut self.rooks,
            Role::Queen => &mut self.queens,
            Role::King => &mut self.kings,
        }
    }

    pub fn total(&self) -> i32 {
        ROLES.iter().map(|&role| self.get(role)).sum()
    }

    /// Centipawn value of the counted material, kings excluded.
    pub fn value(&self) -> i32 {
        ROLES.iter().map(|&role| material_value(role) * self.get(role)).sum()
    }
}

#[derive(Clone)]
pub struct Position {
    setup: Setup,
    /// `[color][role]`, with the color aggregate at `ALL`.
    boards: [[Bitboard; 7]; 2],
    rays: &'static RayTables,
    unit: ScoreUnit,
    pinned: [Cell<Option<Bitboard>>; 2],
    bad_bishops: [Cell<Option<Bitboard>>; 2],
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position").field("fen", &self.fen()).finish()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    /// The empty board, White to move.
    pub fn new() -> Self {
        Self::from_setup(Setup::empty())
    }

    pub fn from_setup(setup: Setup) -> Self {
        let mut position = Self {
            setup,
            boards: [[Bitboard(0); 7]; 2],
            rays: &rays::RAYS,
            unit: ScoreUnit::default(),
            pinned: Default::default(),
            bad_bishops: Default::default(),
        };
        position.rebuild();
        position
    }

    /// Accepts the 4-field form; missing clocks become `0 1`.
    pub fn from_fen(fen: &str) -> Result<Self> {
        Ok(Self::from_setup(board::parse_setup(fen)?))
    }

    pub fn from_chess(chess: &Chess) -> Self {
        Self::from_setup(chess.to_setup(EnPassantMode::Legal))
    }

    pub fn with_unit(mut self, unit: ScoreUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn unit(&self) -> ScoreUnit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: ScoreUnit) {
        self.unit = unit;
    }

    /// The only way the placement changes.
    fn mutate<T>(&mut self, edit: impl FnOnce(&mut Setup) -> T) -> T {
        let out = edit(&mut self.setup);
        self.rebuild();
        out
    }

    fn rebuild(&mut self) {
        let board = &self.setup.board;
        for color in [Color::White, Color::Black] {
            let boards = &mut self.boards[color_index(color)];
            for role in ROLES {
                boards[role_index(role)] = board.by_piece(Piece { color, role });
            }
            boards[ALL] = board.by_color(color);
        }
        for cache in self.pinned.iter().chain(self.bad_bishops.iter()) {
            cache.set(None);
        }
    }

    pub fn set_fen(&mut self, fen: &str) -> Result<()> {
        let setup = board::parse_setup(fen)?;
        self.mutate(|current| *current = setup);
        Ok(())
    }

    /// Plays a legal move. The position itself has to be legal.
    pub fn push(&mut self, mv: &Move) -> Result<()> {
        let chess = board::chess_from_setup(self.setup.clone())?;
        let after = chess
            .play(mv.clone())
            .map_err(|_| Error::IllegalMove(board::move_to_uci(mv)))?;
        self.mutate(|current| *current = after.to_setup(EnPassantMode::Legal));
        Ok(())
    }

    pub fn push_san(&mut self, san: &str) -> Result<Move> {
        let chess = board::chess_from_setup(self.setup.clone())?;
        let mv = board::resolve_san(&chess, san).ok_or_else(|| Error::IllegalMove(san.to_string()))?;
        self.push(&mv)?;
        Ok(mv)
    }

    pub fn set_piece_at(&mut self, square: Square, piece: Piece) {
        self.mutate(|setup| setup.board.set_piece_at(square, piece));
    }

    pub fn remove_piece_at(&mut self, square: Square) -> Option<Piece> {
        self.mutate(|setup| setup.board.remove_piece_at(square))
    }

    pub fn set_turn(&mut self, turn: Color) {
        self.mutate(|setup| setup.turn = turn);
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn board(&self) -> &Board {
        &self.setup.board
    }

    pub fn turn(&self) -> Color {
        self.setup.turn
    }

    pub fn fen(&self) -> String {
        board::setup_fen(&self.setup)
    }

    /// Legal-position view, when the placement is one.
    pub fn to_chess(&self) -> Result<Chess> {
        board::chess_from_setup(self.setup.clone())
    }

    pub fn pieces(&self, color: Color, role: Role) -> Bitboard {
        self.boards[color_index(color)][role_index(role)]
    }

    pub fn all(&self, color: Color) -> Bitboard {
        self.boards[color_index(color)][ALL]
    }

    pub fn occupied(&self) -> Bitboard {
        self.all(Color::White) | self.all(Color::Black)
    }

    pub(crate) fn king(&self, color: Color) -> Option<Square> {
        self.pieces(color, Role::King).into_iter().next()
    }

    /// Fails for indices outside 0..63.
    pub fn square(index: u32) -> Result<Square> {
        if index < 64 {
            Ok(Square::new(index))
        } else {
            Err(Error::InvalidSquare(index))
        }
    }

    pub fn diagonal_ray(&self, square: Square, positive_slope: bool) -> Bitboard {
        self.rays.diagonal[usize::from(positive_slope)][usize::from(square)]
    }

    pub fn horizontal_ray(&self, square: Square) -> Bitboard {
        self.rays.horizontal[usize::from(square)]
    }

    pub fn vertical_ray(&self, square: Square) -> Bitboard {
        self.rays.vertical[usize::from(square)]
    }

    /// d4-e5, or c3-f6 for the extended center.
    pub fn center_area(extended: bool) -> Bitboard {
        if extended {
            area(Square::C3, Square::F6)
        } else {
            area(Square::D4, Square::E5)
        }
    }

    pub fn count(&self, piece: Piece) -> i32 {
        self.pieces(piece.color, piece.role).count() as i32
    }

    pub fn material(&self, color: Color) -> MaterialCount {
        let mut count = MaterialCount::default();
        for role in ROLES {
            *count.get_mut(role) = self.count(Piece { color, role });
        }
        count
    }

    /// White's counts minus Black's.
    pub fn material_balance(&self) -> MaterialCount {
        let (white, black) = (self.material(Color::White), self.material(Color::Black));
        let mut balance = MaterialCount::default();
        for role in ROLES {
            *balance.get_mut(role) = white.get(role) - black.get(role);
        }
        balance
    }

    pub fn pawn_balance(&self) -> i32 {
        self.material_balance().pawns
    }

    /// Material advantage of `color` in centipawns.
    pub fn material_score(&self, color: Color) -> i32 {
        let score = self.material_balance().value();
        match color {
            Color::White => score,
            Color::Black => -score,
        }
    }

    /// Sum of the piece-square values of `color`'s pieces.
    pub fn simple_position_score(&self, color: Color) -> i32 {
        ROLES
            .iter()
            .flat_map(|&role| {
                self.pieces(color, role)
                    .into_iter()
                    .map(move |square| square_value(role, color, square))
            })
            .sum()
    }

    pub fn game_phase(&self) -> GamePhase {
        let material = self.material(Color::White).value() + self.material(Color::Black).value();
        if material >= 2 * (MAX_NON_PAWN_SCORE - 2 * tables::KNIGHT_VALUE) {
            GamePhase::Opening
        } else if material <= tables::BISHOP_VALUE + 4 * tables::KNIGHT_VALUE {
            GamePhase::EndGame
        } else {
            GamePhase::MiddleGame
        }
    }

    /// White's winning chances from the pawn balance (Fischer/Kannan).
    pub fn winning_probability(&self, k: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf(-f64::from(self.pawn_balance()) / k))
    }

    /// `centipawns` in the position's presentation unit.
    pub fn scaled(&self, centipawns: i32) -> f64 {
        self.unit.scale(centipawns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shakmaty::Position as _;

    #[test]
    fn test_empty_board() {
        let position = Position::new();
        assert_eq!(position.fen(), EMPTY_FEN);
        assert!(position.occupied().is_empty());
        assert_eq!(position.game_phase(), GamePhase::EndGame);
    }

    #[test]
    fn test_square_fails_fast() {
        assert_eq!(Position::square(63).unwrap(), Square::H8);
        assert!(matches!(Position::square(64), Err(Error::InvalidSquare(64))));
    }

    #[test]
    fn test_four_field_fen() {
        let position = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w - -").unwrap();
        assert_eq!(position.fen(), "8/8/8/4k3/8/8/8/4K3 w - - 0 1");
    }

    #[test]
    fn test_material_and_phase_at_start() {
        let position = Position::from_chess(&Chess::default());
        let white = position.material(Color::White);
        assert_eq!(white.pawns, 8);
        assert_eq!(white.total(), 16);
        assert_eq!(position.material_score(Color::White), 0);
        assert_eq!(position.game_phase(), GamePhase::Opening);
        assert!((position.winning_probability(DEFAULT_K) - 0.5).abs() < 1e-9);
        assert_eq!(
            position.simple_position_score(Color::White),
            position.simple_position_score(Color::Black)
        );
    }

    #[test]
    fn test_material_score_is_from_color_side() {
        let position = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert_eq!(position.material_score(Color::White), 900);
        assert_eq!(position.material_score(Color::Black), -900);
        let pawns = Position::from_fen("4k3/8/8/8/8/8/PPPP4/4K3 w - - 0 1").unwrap();
        assert!(pawns.winning_probability(DEFAULT_K) > 0.9);
        let scaled = pawns.with_unit(ScoreUnit::Pawns);
        assert!((scaled.scaled(scaled.material_score(Color::White)) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_mutation_rebuilds_bitboards() {
        let mut position = Position::from_chess(&Chess::default());
        position.push_san("e4").unwrap();
        assert!(position.pieces(Color::White, Role::Pawn).contains(Square::E4));
        assert_eq!(position.turn(), Color::Black);
        let removed = position.remove_piece_at(Square::D8);
        assert_eq!(removed, Some(Piece { color: Color::Black, role: Role::Queen }));
        assert_eq!(position.material(Color::Black).queens, 0);
        position.set_piece_at(Square::D4, Piece { color: Color::Black, role: Role::Knight });
        assert_eq!(position.material(Color::Black).knights, 3);
        position.set_turn(Color::White);
        assert_eq!(position.turn(), Color::White);
        assert!(position.push_san("Ke3").is_err());
    }

    #[test]
    fn test_material_counts_match_aggregate_over_playouts() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut chess = Chess::default();
            for _ in 0..rng.random_range(0..120) {
                let moves = chess.legal_moves();
                if moves.is_empty() {
                    break;
                }
                let mv = moves[rng.random_range(0..moves.len())].clone();
                chess = chess.play(mv).unwrap();
                let position = Position::from_chess(&chess);
                for color in [Color::White, Color::Black] {
                    assert_eq!(
                        position.material(color).total() as usize,
                        position.all(color).count()
                    );
                }
            }
        }
    }
}
