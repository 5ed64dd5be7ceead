//! Board helpers shared by the parser, the game tree and the position model

use shakmaty::{
    fen::Fen, san::San, CastlingMode, Chess, Color, EnPassantMode, File, FromSetup, Move, Position, Role, Setup, Square,
};

use crate::error::{Error, Result};

/// Parses a FEN, accepting the 4-field form with the clocks left out.
pub fn parse_setup(fen: &str) -> Result<Setup> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let full = match fields.len() {
        4 => format!("{} 0 1", fields.join(" ")),
        5 => format!("{} 1", fields.join(" ")),
        _ => fields.join(" "),
    };
    let parsed: Fen = full
        .parse()
        .map_err(|e| Error::Fen(format!("{} ({})", fen.trim(), e)))?;
    Ok(parsed.into_setup())
}

pub fn chess_from_setup(setup: Setup) -> Result<Chess> {
    Chess::from_setup(setup, CastlingMode::Standard).map_err(|e| Error::IllegalPosition(e.to_string()))
}

pub fn chess_from_fen(fen: &str) -> Result<Chess> {
    chess_from_setup(parse_setup(fen)?)
}

pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

pub fn setup_fen(setup: &Setup) -> String {
    Fen::try_from_setup(setup.clone()).unwrap_or_else(|e| e.ignore()).to_string()
}

/// Passes the turn. Positions where that is impossible (the mover is in
/// check) are returned unchanged.
pub fn play_null(position: &Chess) -> Chess {
    let mut setup = position.to_setup(EnPassantMode::Legal);
    setup.turn = !setup.turn;
    setup.ep_square = None;
    setup.halfmoves = setup.halfmoves.saturating_add(1);
    if setup.turn == Color::White {
        setup.fullmoves = setup.fullmoves.saturating_add(1);
    }
    Chess::from_setup(setup, CastlingMode::Standard).unwrap_or_else(|_| position.clone())
}

/// Resolves SAN text against a position. Captures written without `x` are
/// accepted.
pub fn resolve_san(position: &Chess, text: &str) -> Option<Move> {
    let san: San = text.parse().ok()?;
    if let Ok(mv) = san.to_move(position) {
        return Some(mv);
    }
    match san {
        San::Normal {
            role,
            file,
            rank,
            capture: false,
            to,
            promotion,
        } => San::Normal {
            role,
            file,
            rank,
            capture: true,
            to,
            promotion,
        }
        .to_move(position)
        .ok(),
        _ => None,
    }
}

/// SAN with check and mate suffixes.
pub fn san_plus(position: &Chess, mv: &Move) -> String {
    let san = San::from_move(position, mv.clone()).to_string();
    match position.clone().play(mv.clone()) {
        Ok(after) if after.is_checkmate() => format!("{}#", san),
        Ok(after) if after.is_check() => format!("{}+", san),
        _ => san,
    }
}

pub fn move_to_uci(mv: &Move) -> String {
    match mv {
        Move::Normal { from, to, promotion, .. } => {
            let promo = promotion
                .map(|r| match r {
                    Role::Queen => "q",
                    Role::Rook => "r",
                    Role::Bishop => "b",
                    Role::Knight => "n",
                    _ => "",
                })
                .unwrap_or("");
            format!("{}{}{}", from, to, promo)
        }
        Move::EnPassant { from, to, .. } => format!("{}{}", from, to),
        Move::Castle { king, rook } => {
            let king_to = if rook.file() > king.file() {
                Square::from_coords(File::G, king.rank())
            } else {
                Square::from_coords(File::C, king.rank())
            };
            format!("{}{}", king, king_to)
        }
        Move::Put { .. } => String::new(),
    }
}

/// Finds the legal move written in UCI notation (`e2e4`, `e7e8q`).
pub fn resolve_uci(position: &Chess, text: &str) -> Option<Move> {
    position
        .legal_moves()
        .into_iter()
        .find(|mv| move_to_uci(mv) == text)
}

/// Result string for a finished game, `None` while it is still going.
pub fn outcome_of(position: &Chess) -> Option<&'static str> {
    if position.is_checkmate() {
        Some(match position.turn() {
            Color::White => "0-1",
            Color::Black => "1-0",
        })
    } else if position.is_stalemate() || position.is_insufficient_material() {
        Some("1/2-1/2")
    } else {
        None
    }
}
