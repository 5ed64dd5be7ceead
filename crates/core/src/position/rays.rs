//! Line tables and bitboard geometry

use once_cell::sync::Lazy;
use shakmaty::{Bitboard, Square};

/// Full lines through every square. Index with `usize::from(square)`.
pub struct RayTables {
    pub horizontal: [Bitboard; 64],
    pub vertical: [Bitboard; 64],
    /// `[negative slope, positive slope]`; positive runs a1-h8.
    pub diagonal: [[Bitboard; 64]; 2],
}

pub(crate) static RAYS: Lazy<RayTables> = Lazy::new(|| {
    let mut rays = RayTables {
        horizontal: [Bitboard(0); 64],
        vertical: [Bitboard(0); 64],
        diagonal: [[Bitboard(0); 64]; 2],
    };
    for square in 0..64 {
        let rank = (square / 8) as i32;
        let file = (square % 8) as i32;
        let mut lines = [0u64; 4];
        for other in 0..64 {
            let r = (other / 8) as i32;
            let f = (other % 8) as i32;
            let bit = 1u64 << other;
            if r == rank {
                lines[0] |= bit;
            }
            if f == file {
                lines[1] |= bit;
            }
            if f + r == file + rank {
                lines[2] |= bit;
            }
            if f - r == file - rank {
                lines[3] |= bit;
            }
        }
        rays.horizontal[square] = Bitboard(lines[0]);
        rays.vertical[square] = Bitboard(lines[1]);
        rays.diagonal[0][square] = Bitboard(lines[2]);
        rays.diagonal[1][square] = Bitboard(lines[3]);
    }
    rays
});

pub(crate) fn bit(square: Square) -> Bitboard {
    Bitboard(1u64 << usize::from(square))
}

/// Squares strictly below `square` in index order.
fn below(square: Square) -> u64 {
    (1u64 << usize::from(square)) - 1
}

/// Squares strictly above `square` in index order.
fn above(square: Square) -> u64 {
    !below(square) & !(1u64 << usize::from(square))
}

/// Rectangle spanned by a lower-left and an upper-right corner.
pub fn area(lower_left: Square, upper_right: Square) -> Bitboard {
    let (l, u) = (usize::from(lower_left), usize::from(upper_right));
    let (lf, lr, uf, ur) = (l % 8, l / 8, u % 8, u / 8);
    assert!(uf >= lf && ur >= lr, "area corners out of order: {} {}", lower_left, upper_right);
    let mut bb = 0u64;
    for rank in lr..=ur {
        for file in lf..=uf {
            bb |= 1u64 << (rank * 8 + file);
        }
    }
    Bitboard(bb)
}

const FILE_A: u64 = 0x0101_0101_0101_0101;

/// Shifts a set by whole files and ranks. Squares leaving the board are
/// dropped; nothing wraps around.
pub fn shift(bb: Bitboard, file_shift: i32, rank_shift: i32) -> Bitboard {
    assert!((-7..=7).contains(&file_shift), "file shift {} out of range", file_shift);
    assert!((-7..=7).contains(&rank_shift), "rank shift {} out of range", rank_shift);
    let mut bits = bb.0;
    if file_shift > 0 {
        let mut keep = 0u64;
        for file in 0..(8 - file_shift) {
            keep |= FILE_A << file;
        }
        bits = (bits & keep) << file_shift;
    } else if file_shift < 0 {
        let mut keep = 0u64;
        for file in (-file_shift)..8 {
            keep |= FILE_A << file;
        }
        bits = (bits & keep) >> -file_shift;
    }
    if rank_shift > 0 {
        bits <<= 8 * rank_shift;
    } else if rank_shift < 0 {
        bits >>= -8 * rank_shift;
    }
    Bitboard(bits)
}

/// Smears a set towards rank 8. One loop covers 2 ranks, two cover 4,
/// three cover the board.
pub fn north_fill(bb: Bitboard, loops: u32) -> Bitboard {
    let mut bits = bb.0;
    bits |= bits << 8;
    if loops >= 2 {
        bits |= bits << 16;
    }
    if loops >= 3 {
        bits |= bits << 32;
    }
    Bitboard(bits)
}

/// Smears a set towards rank 1.
pub fn south_fill(bb: Bitboard, loops: u32) -> Bitboard {
    let mut bits = bb.0;
    bits |= bits >> 8;
    if loops >= 2 {
        bits |= bits >> 16;
    }
    if loops >= 3 {
        bits |= bits >> 32;
    }
    Bitboard(bits)
}

/// Nearest candidate on each side of `square` along a shared line.
pub fn find_nn(square: Square, candidates: Bitboard) -> Bitboard {
    let mut nearest = 0u64;
    let lower = candidates.0 & below(square);
    if lower != 0 {
        nearest |= 1u64 << (63 - lower.leading_zeros());
    }
    let upper = candidates.0 & above(square);
    if upper != 0 {
        nearest |= 1u64 << upper.trailing_zeros();
    }
    Bitboard(nearest)
}

/// Part of `ray` reachable from `square` before hitting an obstacle. The
/// obstacles themselves and `square` are excluded.
pub fn restricted_ray(square: Square, ray: Bitboard, obstacles: Bitboard) -> Bitboard {
    assert!(ray.contains(square), "{} is not on the ray", square);
    let blockers = ray.0 & obstacles.0 & !bit(square).0;
    let mut span = ray.0 & !bit(square).0;
    let lower = blockers & below(square);
    if lower != 0 {
        let stop = 63 - lower.leading_zeros();
        span &= !((2u64 << stop) - 1);
    }
    let upper = blockers & above(square);
    if upper != 0 {
        let stop = upper.trailing_zeros();
        span &= (1u64 << stop) - 1;
    }
    Bitboard(span)
}
