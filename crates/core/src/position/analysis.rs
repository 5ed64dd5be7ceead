//! Set-valued positional queries

use shakmaty::{attacks, Bitboard, Color, Role, Square};

use super::rays::{bit, find_nn, north_fill, restricted_ray, shift, south_fill};
use super::{color_index, Position};

const fn rank(index: u32) -> Bitboard {
    Bitboard(0xff << (8 * index))
}

const fn file(index: u32) -> Bitboard {
    Bitboard(0x0101_0101_0101_0101 << index)
}

/// Squares of `bb` for which `keep` holds.
fn select(bb: Bitboard, keep: impl Fn(Square) -> bool) -> Bitboard {
    let mut out = Bitboard(0);
    for square in bb {
        if keep(square) {
            out |= bit(square);
        }
    }
    out
}

impl Position {
    pub fn unoccupied_squares(&self) -> Bitboard {
        !self.occupied()
    }

    /// Pieces of `attacker` that attack `square`.
    pub fn attackers(&self, square: Square, attacker: Color) -> Bitboard {
        self.board().attacks_to(square, attacker, self.occupied())
    }

    /// The full line through the king of `color` and `square`, or the whole
    /// board when they are not aligned.
    fn pin_line(&self, color: Color, square: Square) -> Bitboard {
        let Some(king) = self.king(color) else {
            return Bitboard(!0);
        };
        [
            self.horizontal_ray(king),
            self.vertical_ray(king),
            self.diagonal_ray(king, true),
            self.diagonal_ray(king, false),
        ]
        .into_iter()
        .find(|ray| ray.contains(square))
        .unwrap_or(Bitboard(!0))
    }

    /// Squares behind `color`'s pawns that an adjacent enemy pawn could take
    /// en passant had they just moved two squares.
    pub fn potential_en_passant_squares(&self, color: Color) -> Bitboard {
        let own = self.pieces(color, Role::Pawn);
        let enemy = self.pieces(!color, Role::Pawn);
        let beside = shift(enemy, 1, 0) | shift(enemy, -1, 0);
        match color {
            Color::White => shift(own & rank(3) & beside, 0, -1),
            Color::Black => shift(own & rank(4) & beside, 0, 1),
        }
    }

    /// Pieces of `color` that are the only piece between their king and an
    /// enemy slider on the same line.
    pub fn pinned_pieces(&self, color: Color) -> Bitboard {
        let cache = &self.pinned[color_index(color)];
        if let Some(pinned) = cache.get() {
            return pinned;
        }
        let pinned = self.find_pinned(color);
        cache.set(Some(pinned));
        pinned
    }

    fn find_pinned(&self, color: Color) -> Bitboard {
        let Some(king) = self.king(color) else {
            return Bitboard(0);
        };
        let enemy = !color;
        let queens = self.pieces(enemy, Role::Queen);
        let diagonal = queens | self.pieces(enemy, Role::Bishop);
        let straight = queens | self.pieces(enemy, Role::Rook);
        let lines = [
            (self.diagonal_ray(king, true), diagonal),
            (self.diagonal_ray(king, false), diagonal),
            (self.horizontal_ray(king), straight),
            (self.vertical_ray(king), straight),
        ];
        let own = self.all(color);
        let occupied = self.occupied();
        let mut pinned = Bitboard(0);
        for (ray, sliders) in lines {
            for slider in find_nn(king, ray & sliders) {
                let span = attacks::between(king, slider) & occupied;
                if span.count() == 1 && (span & own).any() {
                    pinned |= span;
                }
            }
        }
        pinned
    }

    pub fn undefended_pieces(&self, color: Color, exclude_king: bool) -> Bitboard {
        let mut pieces = self.all(color);
        if exclude_king {
            pieces &= !self.pieces(color, Role::King);
        }
        select(pieces, |square| self.attackers(square, color).is_empty())
    }

    pub fn defended_pieces(&self, color: Color) -> Bitboard {
        self.all(color) & !self.undefended_pieces(color, false)
    }

    pub fn hanging_pieces(&self, color: Color) -> Bitboard {
        self.undefended_pieces(color, true) & self.attacked_pieces(color)
    }

    /// Pieces of `color` attacked by an enemy piece that is free to capture.
    pub fn attacked_pieces(&self, color: Color) -> Bitboard {
        let enemy = !color;
        let free = self.all(enemy) & !self.pinned_pieces(enemy);
        select(self.all(color), |square| (self.attackers(square, enemy) & free).any())
    }

    /// Unpinned pieces of `color` that attack an enemy piece.
    pub fn attacking_pieces(&self, color: Color) -> Bitboard {
        let free = self.all(color) & !self.pinned_pieces(color);
        let mut attacking = Bitboard(0);
        for square in self.all(!color) {
            attacking |= self.attackers(square, color) & free;
        }
        attacking
    }

    /// Empty squares `color`'s pieces can move to. Pinned pieces only count
    /// along their pin line.
    pub fn reachable_squares(&self, color: Color) -> Bitboard {
        let occupied = self.occupied();
        let pinned = self.pinned_pieces(color);
        let restrict = |square: Square, targets: Bitboard| {
            if pinned.contains(square) {
                targets & self.pin_line(color, square)
            } else {
                targets
            }
        };
        let mut reach = Bitboard(0);

        for square in self.pieces(color, Role::King) {
            reach |= attacks::king_attacks(square) & !occupied;
        }
        for square in self.pieces(color, Role::Knight) & !pinned {
            reach |= attacks::knight_attacks(square) & !occupied;
        }
        let (forward, start) = match color {
            Color::White => (1, rank(1)),
            Color::Black => (-1, rank(6)),
        };
        for square in self.pieces(color, Role::Pawn) {
            let single = shift(bit(square), 0, forward) & !occupied;
            let mut pushes = single;
            if start.contains(square) && single.any() {
                pushes |= shift(bit(square), 0, 2 * forward) & !occupied;
            }
            reach |= restrict(square, pushes);
        }
        let queens = self.pieces(color, Role::Queen);
        for square in queens | self.pieces(color, Role::Rook) {
            let lines = restricted_ray(square, self.horizontal_ray(square), occupied)
                | restricted_ray(square, self.vertical_ray(square), occupied);
            reach |= restrict(square, lines);
        }
        for square in queens | self.pieces(color, Role::Bishop) {
            let lines = restricted_ray(square, self.diagonal_ray(square, true), occupied)
                | restricted_ray(square, self.diagonal_ray(square, false), occupied);
            reach |= restrict(square, lines);
        }
        reach & !self.all(color)
    }

    /// Knights and sliders with no square to go to other than those held by
    /// their own side or by defended enemy pieces.
    pub fn trapped_pieces(&self, color: Color) -> Bitboard {
        let blocked = self.all(color) | self.defended_pieces(!color);
        let occupied = self.occupied();
        let mut trapped = Bitboard(0);
        for role in [Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
            for square in self.pieces(color, role) {
                let targets = match role {
                    Role::Knight => attacks::knight_attacks(square),
                    Role::Bishop => attacks::bishop_attacks(square, occupied),
                    Role::Rook => attacks::rook_attacks(square, occupied),
                    _ => attacks::queen_attacks(square, occupied),
                };
                if (targets & !blocked).is_empty() {
                    trapped |= bit(square);
                }
            }
        }
        trapped
    }

    /// Center squares where `color` has more attackers than the opponent.
    pub fn controlled_central_squares(&self, color: Color, extended: bool) -> Bitboard {
        select(Self::center_area(extended), |square| {
            self.attackers(square, color).count() > self.attackers(square, !color).count()
        })
    }

    pub fn has_bishop_pair(&self, color: Color) -> bool {
        self.pieces(color, Role::Bishop).count() == 2
    }

    /// Bishops hemmed in by an own pawn with nothing in between.
    pub fn bad_bishops(&self, color: Color) -> Bitboard {
        let cache = &self.bad_bishops[color_index(color)];
        if let Some(bad) = cache.get() {
            return bad;
        }
        let pawns = self.pieces(color, Role::Pawn);
        let occupied = self.occupied();
        let bad = select(self.pieces(color, Role::Bishop), |bishop| {
            [true, false].into_iter().any(|positive| {
                let nearest = find_nn(bishop, self.diagonal_ray(bishop, positive) & pawns);
                select(nearest, |pawn| (attacks::between(bishop, pawn) & occupied).is_empty()).any()
            })
        });
        cache.set(Some(bad));
        bad
    }

    pub fn fiancettoed_bishops(&self, color: Color) -> Bitboard {
        let squares = match color {
            Color::White => bit(Square::B2) | bit(Square::G2),
            Color::Black => bit(Square::B7) | bit(Square::G7),
        };
        self.pieces(color, Role::Bishop) & squares
    }

    /// Pawns sharing a file with another pawn of the same color.
    pub fn stacked_pawns(&self, color: Color) -> Bitboard {
        let pawns = self.pieces(color, Role::Pawn);
        let mut stacked = Bitboard(0);
        for index in 0..8 {
            let on_file = pawns & file(index);
            if on_file.count() > 1 {
                stacked |= on_file;
            }
        }
        stacked
    }

    /// Pawns with no pawn of the same color on an adjacent file.
    pub fn isolated_pawns(&self, color: Color) -> Bitboard {
        let pawns = self.pieces(color, Role::Pawn);
        let neighbours = shift(pawns, 1, 0) | shift(pawns, -1, 0);
        let neighbour_files = north_fill(south_fill(neighbours, 3), 3);
        pawns & !neighbour_files
    }

    /// White pawns on ranks 5-6 (Black: 3-4) with an enemy pawn right ahead.
    pub fn blocked_pawns(&self, color: Color) -> Bitboard {
        let own = self.pieces(color, Role::Pawn);
        let enemy = self.pieces(!color, Role::Pawn);
        match color {
            Color::White => own & shift(enemy, 0, -1) & (rank(4) | rank(5)),
            Color::Black => own & shift(enemy, 0, 1) & (rank(2) | rank(3)),
        }
    }

    /// Pawns defended by a pawn of the same color.
    pub fn supported_pawns(&self, color: Color) -> Bitboard {
        let pawns = self.pieces(color, Role::Pawn);
        let forward = match color {
            Color::White => 1,
            Color::Black => -1,
        };
        pawns & (shift(pawns, 1, forward) | shift(pawns, -1, forward))
    }

    /// Pawns with no enemy pawn ahead on their own or an adjacent file.
    pub fn passed_pawns(&self, color: Color) -> Bitboard {
        let enemy = self.pieces(!color, Role::Pawn);
        select(self.pieces(color, Role::Pawn), |pawn| {
            let cone = bit(pawn) | shift(bit(pawn), 1, 0) | shift(bit(pawn), -1, 0);
            let ahead = match color {
                Color::White => north_fill(shift(cone, 0, 1), 3),
                Color::Black => south_fill(shift(cone, 0, -1), 3),
            };
            (ahead & enemy).is_empty()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Piece;

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn squares(list: &[Square]) -> Bitboard {
        list.iter().fold(Bitboard(0), |acc, &sq| acc | bit(sq))
    }

    #[test]
    fn test_pinned_piece_found_and_cleared() {
        let pinned = position("4k3/8/8/4n3/8/4Q3/8/4K3 b - - 0 1");
        assert_eq!(pinned.pinned_pieces(Color::Black), squares(&[Square::E5]));
        assert!(pinned.pinned_pieces(Color::White).is_empty());

        let free = position("4k3/8/8/3n4/8/4Q3/8/4K3 b - - 0 1");
        assert!(free.pinned_pieces(Color::Black).is_empty());
    }

    #[test]
    fn test_two_blockers_are_not_pinned() {
        let p = position("4k3/4p3/8/4n3/8/4Q3/8/4K3 b - - 0 1");
        assert!(p.pinned_pieces(Color::Black).is_empty());
    }

    #[test]
    fn test_pin_cache_cleared_on_mutation() {
        let mut p = position("4k3/8/8/4n3/8/4Q3/8/4K3 b - - 0 1");
        assert_eq!(p.pinned_pieces(Color::Black).count(), 1);
        p.remove_piece_at(Square::E3);
        assert!(p.pinned_pieces(Color::Black).is_empty());
        p.set_piece_at(Square::A4, Piece { color: Color::White, role: Role::Bishop });
        p.set_piece_at(Square::D7, Piece { color: Color::Black, role: Role::Rook });
        assert_eq!(p.pinned_pieces(Color::Black), squares(&[Square::D7]));
        p.set_piece_at(Square::B5, Piece { color: Color::Black, role: Role::Pawn });
        assert!(p.pinned_pieces(Color::Black).is_empty());
    }

    #[test]
    fn test_pinned_attacker_does_not_count() {
        let p = position("4k3/3b4/8/1B6/6N1/8/8/4K3 w - - 0 1");
        assert_eq!(p.pinned_pieces(Color::Black), squares(&[Square::D7]));
        assert_eq!(p.attackers(Square::G4, Color::Black), squares(&[Square::D7]));
        assert!(!p.attacked_pieces(Color::White).contains(Square::G4));
        assert!(p.attacking_pieces(Color::Black).is_empty());
        let free = position("7k/3b4/8/1B6/6N1/8/8/4K3 w - - 0 1");
        assert!(free.attacked_pieces(Color::White).contains(Square::G4));
        assert!(free.hanging_pieces(Color::White).contains(Square::G4));
        assert!(free.attacking_pieces(Color::Black).contains(Square::D7));
    }

    #[test]
    fn test_defended_and_undefended() {
        let p = position("4k3/8/8/8/8/N7/3P4/4K3 w - - 0 1");
        assert_eq!(p.defended_pieces(Color::White), squares(&[Square::D2]));
        assert_eq!(p.undefended_pieces(Color::White, true), squares(&[Square::A3]));
        assert!(p.undefended_pieces(Color::White, false).contains(Square::E1));
    }

    #[test]
    fn test_reachable_squares_respect_pins() {
        let p = position("4k3/4r3/8/8/8/8/4R3/4K3 w - - 0 1");
        let reach = p.reachable_squares(Color::White);
        assert!(reach.contains(Square::E5));
        assert!(!reach.contains(Square::A2));
        assert!(!reach.contains(Square::E7));
        assert!(reach.contains(Square::D1));
    }

    #[test]
    fn test_pawn_pushes_need_empty_squares() {
        let p = position("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1");
        let reach = p.reachable_squares(Color::White);
        assert!(!reach.contains(Square::E3));
        assert!(!reach.contains(Square::E4));
        let open = position("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert!(open.reachable_squares(Color::White).contains(Square::E4));
    }

    #[test]
    fn test_trapped_knight() {
        let p = position("4k3/8/8/8/2p5/1p6/2p5/N3K3 w - - 0 1");
        assert!(p.trapped_pieces(Color::White).contains(Square::A1));
        let free = position("4k3/8/8/8/2p5/1p6/8/N3K3 w - - 0 1");
        assert!(free.trapped_pieces(Color::White).is_empty());
    }

    #[test]
    fn test_controlled_center() {
        let p = position("4k3/8/8/8/8/8/3PP3/4K3 w - - 0 1");
        assert!(p.controlled_central_squares(Color::White, false).is_empty());
        let pushed = position("4k3/8/8/8/3PP3/8/8/4K3 w - - 0 1");
        assert_eq!(
            pushed.controlled_central_squares(Color::White, false),
            squares(&[Square::D5, Square::E5])
        );
        assert!(pushed
            .controlled_central_squares(Color::White, true)
            .contains(Square::C5));
    }

    #[test]
    fn test_bishops() {
        let p = position("4k3/8/8/8/8/8/1B1P2B1/4K3 w - - 0 1");
        assert_eq!(p.fiancettoed_bishops(Color::White), squares(&[Square::B2, Square::G2]));
        assert!(p.has_bishop_pair(Color::White));
        let bad = position("4k3/8/8/8/8/2P5/1B6/4K3 w - - 0 1");
        assert_eq!(bad.bad_bishops(Color::White), squares(&[Square::B2]));
        let good = position("4k3/8/8/8/8/8/1B6/4K3 w - - 0 1");
        assert!(good.bad_bishops(Color::White).is_empty());
    }

    #[test]
    fn test_pawn_structure() {
        let p = position("4k3/8/8/3p4/3P4/P7/P1P5/4K3 w - - 0 1");
        assert_eq!(p.stacked_pawns(Color::White), squares(&[Square::A2, Square::A3]));
        assert_eq!(p.isolated_pawns(Color::White), squares(&[Square::A2, Square::A3]));
        assert_eq!(p.isolated_pawns(Color::Black), squares(&[Square::D5]));
        assert!(p.blocked_pawns(Color::White).is_empty());
        assert!(p.blocked_pawns(Color::Black).is_empty());
        assert!(p.supported_pawns(Color::White).is_empty());

        let chain = position("4k3/8/8/8/8/1P6/P7/4K3 w - - 0 1");
        assert_eq!(chain.supported_pawns(Color::White), squares(&[Square::B3]));
    }

    #[test]
    fn test_blocked_white_pawn_on_fifth() {
        let p = position("4k3/8/3p4/3P4/8/8/8/4K3 w - - 0 1");
        assert_eq!(p.blocked_pawns(Color::White), squares(&[Square::D5]));
    }

    #[test]
    fn test_passed_pawn_boundary() {
        let passed = position("4k3/8/8/8/3P4/8/8/4K3 w - - 0 1");
        assert_eq!(passed.passed_pawns(Color::White), squares(&[Square::D4]));
        let blocked = position("4k3/8/8/2p5/3P4/8/8/4K3 w - - 0 1");
        assert!(blocked.passed_pawns(Color::White).is_empty());
        let behind = position("4k3/8/8/8/3P4/2p5/8/4K3 w - - 0 1");
        assert_eq!(behind.passed_pawns(Color::White), squares(&[Square::D4]));
    }

    #[test]
    fn test_potential_en_passant() {
        let p = position("4k3/8/8/8/3Pp3/8/8/4K3 w - - 0 1");
        assert_eq!(p.potential_en_passant_squares(Color::White), squares(&[Square::D3]));
        let black = position("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1");
        assert_eq!(black.potential_en_passant_squares(Color::Black), squares(&[Square::D6]));
    }

    #[test]
    fn test_unoccupied_squares() {
        let p = position("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(p.unoccupied_squares().count(), 62);
    }
}
