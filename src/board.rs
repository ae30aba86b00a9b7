use std::fmt;

use thiserror::Error;

/// Index of a point on the board, row-major with row 0 at the top.
pub type Point = usize;

/// Sentinel used internally to mean "no point" in flood fills.
const NO_POINT: Point = usize::MAX;

/// Column letters in GTP coordinates ("I" is skipped by convention).
const COLUMN_LETTERS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

/// The two players.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Index usable for per-color arrays.
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "black"),
            Color::White => write!(f, "white"),
        }
    }
}

/// A move: either a pass or a play on a point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Move {
    Pass,
    Play(Point),
}

impl Move {
    pub fn is_pass(self) -> bool {
        matches!(self, Move::Pass)
    }
}

/// GTP-style name of a point ("A1" is the lower-left corner).
pub fn point_name(p: Point, size: usize) -> String {
    let row = p / size;
    let col = p % size;
    format!("{}{}", COLUMN_LETTERS[col] as char, size - row)
}

/// GTP-style name of a move.
pub fn move_name(mv: Move, size: usize) -> String {
    match mv {
        Move::Pass => "PASS".to_string(),
        Move::Play(p) => point_name(p, size),
    }
}

/// Rule variant flags consumed by move generation and scoring.
#[derive(Clone, Copy, Debug)]
pub struct Rules {
    /// Compensation added to White's score.
    pub komi: f32,
    /// Whether suicide moves are legal. Simulations require this to be off.
    pub allow_suicide: bool,
    /// Whether dead stones must be captured before scoring. When true, a
    /// double pass is always a terminal position.
    pub capture_dead: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            komi: 7.5,
            allow_suicide: false,
            capture_dead: false,
        }
    }
}

/// Errors reported when applying a move through the checked API.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum BoardError {
    #[error("point is outside the board")]
    OutOfBounds,
    #[error("point is occupied")]
    Occupied,
    #[error("move violates the ko rule")]
    Ko,
    #[error("move would be suicide")]
    Suicide,
}

/// A Go board with enough of the rules to run simulated games: legality
/// (including simple ko and suicide), capture, stone counts, and the move
/// history facts the search needs (pass pairs, capture count of the last
/// move).
///
/// Cloning a board is cheap enough to reset a worker's position once per
/// simulated game.
#[derive(Clone, Debug)]
pub struct Board {
    size: usize,
    points: Vec<Option<Color>>,
    to_play: Color,
    move_number: usize,
    stones: [u32; 2],
    ko_point: Option<Point>,
    last_move: Option<Move>,
    prev_move: Option<Move>,
    captured_last: u32,
    rules: Rules,
}

impl Board {
    pub fn new(size: usize, rules: Rules) -> Self {
        assert!((2..=19).contains(&size), "unsupported board size {}", size);
        Board {
            size,
            points: vec![None; size * size],
            to_play: Color::Black,
            move_number: 0,
            stones: [0, 0],
            ko_point: None,
            last_move: None,
            prev_move: None,
            captured_last: 0,
            rules,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn area(&self) -> usize {
        self.size * self.size
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn to_play(&self) -> Color {
        self.to_play
    }

    pub fn move_number(&self) -> usize {
        self.move_number
    }

    /// Number of stones of `c` currently on the board.
    pub fn stones(&self, c: Color) -> u32 {
        self.stones[c.index()]
    }

    /// Number of opponent stones captured by the last executed move.
    pub fn captured_by_last_move(&self) -> u32 {
        self.captured_last
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    /// True if the last two moves were both passes.
    pub fn two_passes(&self) -> bool {
        matches!(
            (self.last_move, self.prev_move),
            (Some(Move::Pass), Some(Move::Pass))
        )
    }

    pub fn point(&self, p: Point) -> Option<Color> {
        self.points[p]
    }

    pub fn is_empty(&self, p: Point) -> bool {
        self.points[p].is_none()
    }

    pub fn occupied(&self, p: Point) -> bool {
        self.points[p].is_some()
    }

    /// All points of the board, in iteration order.
    pub fn all_points(&self) -> std::ops::Range<Point> {
        0..self.area()
    }

    /// Orthogonal neighbors of `p`.
    pub fn neighbors(&self, p: Point) -> impl Iterator<Item = Point> {
        let size = self.size;
        let (row, col) = (p / size, p % size);
        [
            (row > 0).then(|| p - size),
            (row + 1 < size).then(|| p + size),
            (col > 0).then(|| p - 1),
            (col + 1 < size).then(|| p + 1),
        ]
        .into_iter()
        .flatten()
    }

    /// Diagonal neighbors of `p`.
    pub fn diagonals(&self, p: Point) -> impl Iterator<Item = Point> {
        let size = self.size;
        let (row, col) = (p / size, p % size);
        [
            (row > 0 && col > 0).then(|| p - size - 1),
            (row > 0 && col + 1 < size).then(|| p - size + 1),
            (row + 1 < size && col > 0).then(|| p + size - 1),
            (row + 1 < size && col + 1 < size).then(|| p + size + 1),
        ]
        .into_iter()
        .flatten()
    }

    /// Legality for `c` at `p`: empty, not a simple-ko retake, and not
    /// suicide unless the rules allow it.
    pub fn is_legal(&self, p: Point, c: Color) -> bool {
        if p >= self.points.len() || self.points[p].is_some() {
            return false;
        }
        if self.ko_point == Some(p) && c == self.to_play {
            return false;
        }
        self.rules.allow_suicide || !self.is_suicide(p, c)
    }

    fn is_suicide(&self, p: Point, c: Color) -> bool {
        for n in self.neighbors(p) {
            match self.points[n] {
                None => return false,
                Some(nc) if nc == c => {
                    // Joining a block that keeps a liberty besides p.
                    if self.block_has_liberty_other_than(n, p) {
                        return false;
                    }
                }
                Some(_) => {
                    // Capturing an adjacent block in atari.
                    if !self.block_has_liberty_other_than(n, p) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Checked move application for the public API. The simulation hot path
    /// uses `play_unchecked` on moves that were already vetted.
    pub fn play(&mut self, mv: Move) -> Result<(), BoardError> {
        if let Move::Play(p) = mv {
            if p >= self.points.len() {
                return Err(BoardError::OutOfBounds);
            }
            if self.points[p].is_some() {
                return Err(BoardError::Occupied);
            }
            if self.ko_point == Some(p) {
                return Err(BoardError::Ko);
            }
            if !self.rules.allow_suicide && self.is_suicide(p, self.to_play) {
                return Err(BoardError::Suicide);
            }
        }
        self.play_unchecked(mv);
        Ok(())
    }

    /// Applies a move known to be legal.
    pub fn play_unchecked(&mut self, mv: Move) {
        match mv {
            Move::Pass => {
                self.ko_point = None;
                self.captured_last = 0;
            }
            Move::Play(p) => {
                debug_assert!(self.is_legal(p, self.to_play));
                let c = self.to_play;
                let opp = c.opponent();
                self.points[p] = Some(c);
                self.stones[c.index()] += 1;

                let mut captured = 0u32;
                let mut single_capture = None;
                for n in self.neighbors(p) {
                    if self.points[n] == Some(opp) && !self.block_has_liberty(n) {
                        let block = self.block_points(n);
                        captured += block.len() as u32;
                        if block.len() == 1 {
                            single_capture = Some(block[0]);
                        }
                        self.stones[opp.index()] -= block.len() as u32;
                        for q in block {
                            self.points[q] = None;
                        }
                    }
                }

                if captured == 0 && !self.block_has_liberty(p) {
                    // Suicide, legal only under the matching rule variant.
                    debug_assert!(self.rules.allow_suicide);
                    let block = self.block_points(p);
                    self.stones[c.index()] -= block.len() as u32;
                    for q in block {
                        self.points[q] = None;
                    }
                }

                self.ko_point = None;
                if captured == 1 {
                    if let Some(kp) = single_capture {
                        // Simple ko: a lone stone in atari recaptured a
                        // lone stone.
                        if self.block_points(p).len() == 1 && self.count_liberties(p) == 1 {
                            self.ko_point = Some(kp);
                        }
                    }
                }
                self.captured_last = captured;
            }
        }
        self.prev_move = self.last_move;
        self.last_move = Some(mv);
        self.to_play = self.to_play.opponent();
        self.move_number += 1;
    }

    fn block_has_liberty(&self, start: Point) -> bool {
        self.block_has_liberty_other_than(start, NO_POINT)
    }

    /// True if the block at `start` has any liberty other than `exclude`.
    fn block_has_liberty_other_than(&self, start: Point, exclude: Point) -> bool {
        let color = match self.points[start] {
            Some(c) => c,
            None => return true,
        };
        let mut visited = vec![false; self.points.len()];
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(p) = stack.pop() {
            for n in self.neighbors(p) {
                match self.points[n] {
                    None => {
                        if n != exclude {
                            return true;
                        }
                    }
                    Some(c) if c == color && !visited[n] => {
                        visited[n] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        false
    }

    /// All points of the block containing `start` (must be occupied).
    fn block_points(&self, start: Point) -> Vec<Point> {
        let color = self.points[start];
        debug_assert!(color.is_some());
        let mut visited = vec![false; self.points.len()];
        let mut block = vec![start];
        let mut i = 0;
        visited[start] = true;
        while i < block.len() {
            let p = block[i];
            i += 1;
            for n in self.neighbors(p) {
                if !visited[n] && self.points[n] == color {
                    visited[n] = true;
                    block.push(n);
                }
            }
        }
        block
    }

    fn count_liberties(&self, start: Point) -> usize {
        let mut liberties = 0;
        let mut seen = vec![false; self.points.len()];
        for p in self.block_points(start) {
            for n in self.neighbors(p) {
                if self.points[n].is_none() && !seen[n] {
                    seen[n] = true;
                    liberties += 1;
                }
            }
        }
        liberties
    }

    /// Single-point eye for `c`: an empty point whose orthogonal neighbors
    /// are all `c` stones, with no opponent diagonal on the edge or corner
    /// and at most one in the center. Playout move generation skips these.
    pub fn is_simple_eye(&self, p: Point, c: Color) -> bool {
        if self.points[p].is_some() {
            return false;
        }
        for n in self.neighbors(p) {
            if self.points[n] != Some(c) {
                return false;
            }
        }
        let opp = c.opponent();
        let mut diagonals = 0;
        let mut opp_diagonals = 0;
        for d in self.diagonals(p) {
            diagonals += 1;
            if self.points[d] == Some(opp) {
                opp_diagonals += 1;
            }
        }
        if diagonals < 4 {
            opp_diagonals == 0
        } else {
            opp_diagonals <= 1
        }
    }

    /// True if playing `c` at `p` leaves the resulting block with at most
    /// one liberty. Used by the playout-policy cross-check.
    pub fn is_self_atari(&self, p: Point, c: Color) -> bool {
        if self.points[p].is_some() {
            return false;
        }
        let area = self.points.len();
        // Opponent stones this move would capture count as liberties.
        let mut captured = vec![false; area];
        for n in self.neighbors(p) {
            if self.points[n] == Some(c.opponent())
                && !captured[n]
                && !self.block_has_liberty_other_than(n, p)
            {
                for q in self.block_points(n) {
                    captured[q] = true;
                }
            }
        }
        let mut in_block = vec![false; area];
        let mut lib_seen = vec![false; area];
        let mut stack = vec![p];
        in_block[p] = true;
        let mut liberties = 0;
        while let Some(q) = stack.pop() {
            for n in self.neighbors(q) {
                if in_block[n] || lib_seen[n] {
                    continue;
                }
                if captured[n] || self.points[n].is_none() {
                    lib_seen[n] = true;
                    liberties += 1;
                    if liberties > 1 {
                        return false;
                    }
                } else if self.points[n] == Some(c) {
                    in_block[n] = true;
                    stack.push(n);
                }
            }
        }
        liberties <= 1
    }

    /// The non-terminal-point predicate of the playout phase: empty, not a
    /// simple eye for `c`, and legal for `c`. A policy may pass only when no
    /// point outside the safe sets satisfies this.
    pub fn is_playout_candidate(&self, p: Point, c: Color) -> bool {
        self.points[p].is_none() && !self.is_simple_eye(p, c) && self.is_legal(p, c)
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str], rules: Rules) -> Board {
        let size = rows.len();
        let mut board = Board::new(size, rules);
        for (row, line) in rows.iter().enumerate() {
            assert_eq!(line.len(), size);
            for (col, ch) in line.bytes().enumerate() {
                let p = row * size + col;
                match ch {
                    b'X' => {
                        board.points[p] = Some(Color::Black);
                        board.stones[Color::Black.index()] += 1;
                    }
                    b'O' => {
                        board.points[p] = Some(Color::White);
                        board.stones[Color::White.index()] += 1;
                    }
                    b'.' => {}
                    _ => panic!("bad board char {:?}", ch as char),
                }
            }
        }
        board
    }

    #[cfg(test)]
    pub(crate) fn set_to_play(&mut self, c: Color) {
        self.to_play = c;
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for col in 0..self.size {
            write!(f, " {}", COLUMN_LETTERS[col] as char)?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{:2}", self.size - row)?;
            for col in 0..self.size {
                let ch = match self.points[row * self.size + col] {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, " {}", ch)?;
            }
            writeln!(f, " {}", self.size - row)?;
        }
        write!(f, "  ")?;
        for col in 0..self.size {
            write!(f, " {}", COLUMN_LETTERS[col] as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_komi() -> Rules {
        Rules {
            komi: 0.0,
            ..Rules::default()
        }
    }

    #[test]
    fn test_new_board() {
        let bd = Board::new(9, Rules::default());
        assert_eq!(bd.size(), 9);
        assert_eq!(bd.area(), 81);
        assert_eq!(bd.to_play(), Color::Black);
        assert_eq!(bd.stones(Color::Black), 0);
        assert_eq!(bd.move_number(), 0);
        assert!(bd.all_points().all(|p| bd.is_empty(p)));
    }

    #[test]
    fn test_play_and_alternation() {
        let mut bd = Board::new(9, Rules::default());
        bd.play(Move::Play(0)).unwrap();
        assert_eq!(bd.point(0), Some(Color::Black));
        assert_eq!(bd.to_play(), Color::White);
        assert_eq!(bd.move_number(), 1);
        assert_eq!(bd.play(Move::Play(0)), Err(BoardError::Occupied));
        bd.play(Move::Pass).unwrap();
        assert_eq!(bd.to_play(), Color::Black);
    }

    #[test]
    fn test_capture_single_stone() {
        // White stone on B2 of a 5x5, surrounded on three sides.
        let mut bd = Board::from_rows(
            &[
                ".....", //
                ".....",
                ".....",
                ".XO..",
                "..X..",
            ],
            no_komi(),
        );
        bd.set_to_play(Color::Black);
        // C3 is above the white stone at C2 (row 3, col 2).
        bd.play(Move::Play(2 * 5 + 2)).unwrap();
        assert_eq!(bd.to_play(), Color::White);
        bd.play(Move::Pass).unwrap();
        // D2 delivers the capture.
        bd.play(Move::Play(3 * 5 + 3)).unwrap();
        assert!(bd.is_empty(3 * 5 + 2));
        assert_eq!(bd.captured_by_last_move(), 1);
        assert_eq!(bd.stones(Color::White), 0);
    }

    #[test]
    fn test_suicide_illegal() {
        // Empty point at A5 (corner) surrounded by white.
        let bd = Board::from_rows(
            &[
                ".O...", //
                "OO...",
                ".....",
                ".....",
                ".....",
            ],
            no_komi(),
        );
        assert!(!bd.is_legal(0, Color::Black));
        assert!(bd.is_legal(0, Color::White));
    }

    #[test]
    fn test_suicide_allowed_variant() {
        let rules = Rules {
            komi: 0.0,
            allow_suicide: true,
            ..Rules::default()
        };
        let mut bd = Board::from_rows(
            &[
                ".O...", //
                "OO...",
                ".....",
                ".....",
                ".....",
            ],
            rules,
        );
        bd.set_to_play(Color::Black);
        assert!(bd.is_legal(0, Color::Black));
        bd.play(Move::Play(0)).unwrap();
        assert!(bd.is_empty(0));
        assert_eq!(bd.stones(Color::Black), 0);
    }

    #[test]
    fn test_ko_retake_forbidden() {
        let mut bd = Board::new(4, no_komi());
        // Build the textbook ko shape move by move (Black odd points around
        // 5, White around 6), finishing with Black filling point 6 in
        // self-atari.
        for mv in [1, 2, 4, 7, 9, 10, 6] {
            bd.play(Move::Play(mv)).unwrap();
        }
        // Board now:
        //   . X O .
        //   X . X O
        //   . X O .
        // White takes the ko at B3 (point 5), capturing C3 (point 6).
        bd.play(Move::Play(5)).unwrap();
        assert_eq!(bd.captured_by_last_move(), 1);
        assert!(bd.is_empty(6));
        // Black may not retake immediately.
        assert!(!bd.is_legal(6, Color::Black));
        assert_eq!(bd.play(Move::Play(6)), Err(BoardError::Ko));
        // After a move elsewhere the ko is open again.
        bd.play(Move::Play(15)).unwrap();
        bd.play(Move::Pass).unwrap();
        assert!(bd.is_legal(6, Color::Black));
    }

    #[test]
    fn test_two_passes() {
        let mut bd = Board::new(5, no_komi());
        assert!(!bd.two_passes());
        bd.play(Move::Pass).unwrap();
        assert!(!bd.two_passes());
        bd.play(Move::Pass).unwrap();
        assert!(bd.two_passes());
        bd.play(Move::Play(0)).unwrap();
        assert!(!bd.two_passes());
    }

    #[test]
    fn test_simple_eye() {
        // Black eye in the corner at A5 (point 0) and a center eye at C3.
        let bd = Board::from_rows(
            &[
                ".X...", //
                "XX...",
                ".XXX.",
                ".X.X.",
                ".XXX.",
            ],
            no_komi(),
        );
        assert!(bd.is_simple_eye(0, Color::Black));
        assert!(!bd.is_simple_eye(0, Color::White));
        let center = 3 * 5 + 2;
        assert!(bd.is_simple_eye(center, Color::Black));
        // An occupied point is never an eye.
        assert!(!bd.is_simple_eye(1, Color::Black));
    }

    #[test]
    fn test_eye_spoiled_by_diagonal() {
        // Corner eye with an opponent diagonal is not simple.
        let bd = Board::from_rows(
            &[
                ".X...", //
                "XO...",
                ".....",
                ".....",
                ".....",
            ],
            no_komi(),
        );
        assert!(!bd.is_simple_eye(0, Color::Black));
    }

    #[test]
    fn test_self_atari() {
        // Playing A5 leaves a lone black stone with one liberty.
        let bd = Board::from_rows(
            &[
                "..O..", //
                "OO...",
                ".....",
                ".....",
                ".....",
            ],
            no_komi(),
        );
        assert!(bd.is_self_atari(0, Color::Black));
        assert!(!bd.is_self_atari(3 * 5 + 3, Color::Black));
    }

    #[test]
    fn test_playout_candidate() {
        let bd = Board::from_rows(
            &[
                ".X...", //
                "XX...",
                ".....",
                ".....",
                ".....",
            ],
            no_komi(),
        );
        // The corner is Black's eye: not a candidate for Black, but White
        // cannot play it either (suicide).
        assert!(!bd.is_playout_candidate(0, Color::Black));
        assert!(!bd.is_playout_candidate(0, Color::White));
        assert!(bd.is_playout_candidate(12, Color::Black));
        assert!(bd.is_playout_candidate(12, Color::White));
    }

    #[test]
    fn test_point_names() {
        assert_eq!(point_name(0, 9), "A9");
        assert_eq!(point_name(80, 9), "J1");
        assert_eq!(move_name(Move::Pass, 9), "PASS");
        assert_eq!(move_name(Move::Play(4 * 9 + 4), 9), "E5");
    }
}
