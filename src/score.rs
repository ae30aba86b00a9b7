//! The two scoring primitives consumed by the simulation engine: a
//! Tromp-Taylor area score that works on arbitrary positions, and a faster
//! end-position score for double-pass terminal positions that can consult
//! externally proven safe points.

use crate::board::{Board, Color, Point};
use crate::safety::BwSet;

/// Final ownership of a point in a scored position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Owner {
    Black,
    White,
    Neutral,
}

impl Owner {
    fn stone(c: Color) -> Owner {
        match c {
            Color::Black => Owner::Black,
            Color::White => Owner::White,
        }
    }
}

/// Tromp-Taylor area score from Black's perspective, minus komi. Stones
/// count for their color; an empty region counts for a color if it reaches
/// only stones of that color, and is neutral otherwise. Computable on any
/// position, including mid-playout ones.
///
/// If `ownership` is given it is resized to the board area and filled with
/// the per-point result.
pub fn tromp_taylor_score(bd: &Board, komi: f32, mut ownership: Option<&mut Vec<Owner>>) -> f32 {
    let area = bd.area();
    if let Some(o) = ownership.as_mut() {
        o.clear();
        o.resize(area, Owner::Neutral);
    }
    let mut black = 0i32;
    let mut white = 0i32;
    let mut visited = vec![false; area];
    let mut region = Vec::new();
    for p in bd.all_points() {
        match bd.point(p) {
            Some(Color::Black) => {
                black += 1;
                if let Some(o) = ownership.as_mut() {
                    o[p] = Owner::Black;
                }
            }
            Some(Color::White) => {
                white += 1;
                if let Some(o) = ownership.as_mut() {
                    o[p] = Owner::White;
                }
            }
            None => {
                if visited[p] {
                    continue;
                }
                let owner = empty_region_owner(bd, p, &mut visited, &mut region);
                match owner {
                    Owner::Black => black += region.len() as i32,
                    Owner::White => white += region.len() as i32,
                    Owner::Neutral => {}
                }
                if let Some(o) = ownership.as_mut() {
                    for &q in &region {
                        o[q] = owner;
                    }
                }
            }
        }
    }
    (black - white) as f32 - komi
}

/// Flood-fills the empty region containing `start` into `region` and
/// returns which color (if exactly one) the region reaches.
fn empty_region_owner(
    bd: &Board,
    start: Point,
    visited: &mut [bool],
    region: &mut Vec<Point>,
) -> Owner {
    region.clear();
    region.push(start);
    visited[start] = true;
    let mut reaches_black = false;
    let mut reaches_white = false;
    let mut i = 0;
    while i < region.len() {
        let p = region[i];
        i += 1;
        for n in bd.neighbors(p) {
            match bd.point(n) {
                None => {
                    if !visited[n] {
                        visited[n] = true;
                        region.push(n);
                    }
                }
                Some(Color::Black) => reaches_black = true,
                Some(Color::White) => reaches_white = true,
            }
        }
    }
    match (reaches_black, reaches_white) {
        (true, false) => Owner::Black,
        (false, true) => Owner::White,
        _ => Owner::Neutral,
    }
}

/// Score of a terminal position reached by two consecutive playout passes,
/// from Black's perspective, minus komi. Points in a safe set score for
/// that color regardless of what sits on them; other stones score for their
/// own color; other empty points score for a color only if every adjacent
/// stone is that color.
pub fn score_end_position(
    bd: &Board,
    komi: f32,
    safe: &BwSet,
    mut ownership: Option<&mut Vec<Owner>>,
) -> f32 {
    let area = bd.area();
    if let Some(o) = ownership.as_mut() {
        o.clear();
        o.resize(area, Owner::Neutral);
    }
    let mut black = 0i32;
    let mut white = 0i32;
    for p in bd.all_points() {
        let owner = score_point(bd, p, safe);
        match owner {
            Owner::Black => black += 1,
            Owner::White => white += 1,
            Owner::Neutral => {}
        }
        if let Some(o) = ownership.as_mut() {
            o[p] = owner;
        }
    }
    (black - white) as f32 - komi
}

fn score_point(bd: &Board, p: Point, safe: &BwSet) -> Owner {
    if safe.black.contains(p) {
        return Owner::Black;
    }
    if safe.white.contains(p) {
        return Owner::White;
    }
    if let Some(c) = bd.point(p) {
        return Owner::stone(c);
    }
    let mut reaches_black = false;
    let mut reaches_white = false;
    for n in bd.neighbors(p) {
        match bd.point(n) {
            Some(Color::Black) => reaches_black = true,
            Some(Color::White) => reaches_white = true,
            None => {}
        }
    }
    match (reaches_black, reaches_white) {
        (true, false) => Owner::Black,
        (false, true) => Owner::White,
        _ => Owner::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Rules;

    fn no_komi() -> Rules {
        Rules {
            komi: 0.0,
            ..Rules::default()
        }
    }

    #[test]
    fn test_empty_board_scores_zero() {
        let bd = Board::new(9, no_komi());
        assert_eq!(tromp_taylor_score(&bd, 0.0, None), 0.0);
        assert_eq!(tromp_taylor_score(&bd, 6.5, None), -6.5);
    }

    #[test]
    fn test_all_black_with_eyes() {
        let bd = Board::from_rows(
            &[
                ".X.", //
                "XXX",
                ".X.",
            ],
            no_komi(),
        );
        // Every empty point reaches only black.
        assert_eq!(tromp_taylor_score(&bd, 0.0, None), 9.0);
    }

    #[test]
    fn test_contested_region_is_neutral() {
        let bd = Board::from_rows(
            &[
                "X.O", //
                "X.O",
                "X.O",
            ],
            no_komi(),
        );
        // The middle column reaches both colors.
        assert_eq!(tromp_taylor_score(&bd, 0.0, None), 0.0);
        let mut owners = Vec::new();
        tromp_taylor_score(&bd, 0.0, Some(&mut owners));
        assert_eq!(owners[0], Owner::Black);
        assert_eq!(owners[1], Owner::Neutral);
        assert_eq!(owners[2], Owner::White);
    }

    #[test]
    fn test_divided_board() {
        let bd = Board::from_rows(
            &[
                "..X.O", //
                "..X.O",
                "..X.O",
                "..X.O",
                "..X.O",
            ],
            no_komi(),
        );
        // Black: 5 stones + 10 territory; White: 5 stones + column D is
        // contested (reaches both).
        assert_eq!(tromp_taylor_score(&bd, 0.0, None), 10.0);
    }

    #[test]
    fn test_end_position_score() {
        let bd = Board::from_rows(
            &[
                "X.X.O", //
                "XXX.O",
                "XXOOO",
                "XXO..",
                "XXO..",
            ],
            no_komi(),
        );
        let safe = BwSet::new(bd.area());
        let score = score_end_position(&bd, 0.0, &safe, None);
        // Black 11 stones + 2 single-color empties (A5 row eyes at index 1
        // and nothing else), White 9 stones + 4 empties in the corner.
        let mut owners = Vec::new();
        score_end_position(&bd, 0.0, &safe, Some(&mut owners));
        let b = owners.iter().filter(|&&o| o == Owner::Black).count() as i32;
        let w = owners.iter().filter(|&&o| o == Owner::White).count() as i32;
        assert_eq!(score, (b - w) as f32);
        assert_eq!(owners[1], Owner::Black);
        assert_eq!(owners[3], Owner::Neutral);
        assert_eq!(owners[18], Owner::White);
    }

    #[test]
    fn test_safe_sets_override_stones() {
        let bd = Board::from_rows(
            &[
                "X..", //
                "...",
                "..O",
            ],
            no_komi(),
        );
        let mut safe = BwSet::new(bd.area());
        // The black stone's point is proven white: it scores for white.
        safe.white.insert(0);
        let mut owners = Vec::new();
        score_end_position(&bd, 0.0, &safe, Some(&mut owners));
        assert_eq!(owners[0], Owner::White);
    }
}
