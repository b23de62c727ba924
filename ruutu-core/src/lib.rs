//! Ruutupaperi line-forming game logic on an unbounded grid.
//!
//! # Grid
//!
//! ```text
//! Stones sit on integer intersections (col, row). Columns grow to the
//! right, rows grow downwards. The grid is unbounded apart from a sanity
//! cap of |col|, |row| < 10000 that keeps every scan finite.
//!
//!          col -2  -1   0   1   2
//!   row -1    .   .   .   .   .
//!   row  0    .   o   o   o   .      o = stone
//!   row  1    .   .   .   .   .
//! ```
//!
//! # Lines
//!
//! ```text
//! A line is exactly 5 adjacent stones along one of four directions:
//!
//!   Horizontal    ( 1, 0)    o o o o o
//!   Vertical      ( 0, 1)
//!   Diagonal      ( 1, 1)    down-right
//!   AntiDiagonal  ( 1,-1)    up-right
//!
//! Points are ordered from the negative end to the positive end of the
//! direction. The canonical key joins them as "c,r|c,r|c,r|c,r|c,r".
//! ```
//!
//! # Overlap rule
//!
//! Two lines conflict when they run in the same direction and share any
//! point other than the stone just placed. Lines in different directions
//! may always cross.

pub mod game;
pub mod highscore;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use game::{EngineError, Game, Outcome, Phase, Placement, Preview, Rejection, Snapshot, Status};
pub use highscore::{HighscoreRecord, LineKey, ScoreSubmission, DISPLAY_LIMIT, RETAIN_LIMIT};

/// Coordinates must stay strictly below this magnitude.
pub const COORD_LIMIT: u32 = 10_000;

/// Number of stones in a scoring line.
pub const LINE_LEN: usize = 5;

/// How far a run is followed from the queried point in each direction.
const MAX_WALK: i32 = 9;

/// A grid intersection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct Point {
    pub col: i32,
    pub row: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { col: 0, row: 0 };

    /// Create a point from column and row.
    #[inline]
    pub const fn new(col: i32, row: i32) -> Point {
        Point { col, row }
    }

    /// Move `steps` intersections along `dir` (negative steps go backwards).
    #[inline]
    pub fn step(self, dir: Direction, steps: i32) -> Point {
        let (dx, dy) = dir.delta();
        Point {
            col: self.col.saturating_add(dx * steps),
            row: self.row.saturating_add(dy * steps),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

impl From<(i32, i32)> for Point {
    fn from((col, row): (i32, i32)) -> Point {
        Point { col, row }
    }
}

/// Line direction. Undirected: (dx, dy) and (-dx, -dy) are the same line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
}

impl Direction {
    /// All four directions in detection order.
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::Diagonal,
        Direction::AntiDiagonal,
    ];

    /// Unit step (dx, dy) of the positive direction.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Vertical => (0, 1),
            Direction::Diagonal => (1, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }
}

/// Five adjacent stones in one direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Line {
    points: [Point; LINE_LEN],
    direction: Direction,
}

impl Line {
    /// Build the line that starts at `start` (its negative end) and runs along `direction`.
    pub fn from_start(start: Point, direction: Direction) -> Line {
        let mut points = [start; LINE_LEN];
        for (k, point) in points.iter_mut().enumerate() {
            *point = start.step(direction, k as i32);
        }
        Line { points, direction }
    }

    /// The five points, negative end first.
    #[inline]
    pub fn points(&self) -> &[Point; LINE_LEN] {
        &self.points
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// First point (negative end).
    #[inline]
    pub fn start(&self) -> Point {
        self.points[0]
    }

    /// Last point (positive end).
    #[inline]
    pub fn end(&self) -> Point {
        self.points[LINE_LEN - 1]
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.points.contains(&p)
    }

    /// Canonical identity: the ordered points joined as `c,r|c,r|...`.
    pub fn key(&self) -> String {
        self.points
            .iter()
            .map(Point::to_string)
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Check whether two lines may not both be scored.
    ///
    /// Lines conflict if they run in the same direction and share a point
    /// other than `allowed`. Crossing lines never conflict.
    pub fn conflicts_with(&self, other: &Line, allowed: Point) -> bool {
        if self.direction != other.direction {
            return false;
        }
        self.points
            .iter()
            .any(|&p| p != allowed && other.contains(p))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Inclusive rectangle of intersections.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Region {
    pub min: Point,
    pub max: Point,
}

impl Region {
    pub fn new(min: Point, max: Point) -> Region {
        Region { min, max }
    }

    /// Grow the region by `margin` intersections on every side.
    pub fn expand(self, margin: i32) -> Region {
        Region {
            min: Point::new(self.min.col.saturating_sub(margin), self.min.row.saturating_sub(margin)),
            max: Point::new(self.max.col.saturating_add(margin), self.max.row.saturating_add(margin)),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        (self.min.col..=self.max.col).contains(&p.col) && (self.min.row..=self.max.row).contains(&p.row)
    }

    /// Iterate column by column, rows within each column.
    pub fn points(self) -> impl Iterator<Item = Point> {
        (self.min.col..=self.max.col)
            .flat_map(move |col| (self.min.row..=self.max.row).map(move |row| Point::new(col, row)))
    }
}

// ========== Board ==========

/// Set of occupied intersections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    stones: HashSet<Point>,
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Board {
        Board::default()
    }

    /// Check the sanity cap on coordinates.
    #[inline]
    pub fn is_in_bounds(p: Point) -> bool {
        p.col.unsigned_abs() < COORD_LIMIT && p.row.unsigned_abs() < COORD_LIMIT
    }

    #[inline]
    pub fn is_occupied(&self, p: Point) -> bool {
        self.stones.contains(&p)
    }

    /// Add a stone. Placing on an occupied point is a no-op.
    #[inline]
    pub fn place(&mut self, p: Point) {
        self.stones.insert(p);
    }

    /// Remove a stone. Removing from an empty point is a no-op.
    #[inline]
    pub fn remove(&mut self, p: Point) {
        self.stones.remove(&p);
    }

    pub fn clear(&mut self) {
        self.stones.clear();
    }

    pub fn len(&self) -> usize {
        self.stones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stones.is_empty()
    }

    /// Stones in sorted (col, row) order.
    pub fn iter(&self) -> impl Iterator<Item = Point> {
        let mut stones: Vec<Point> = self.stones.iter().copied().collect();
        stones.sort_unstable();
        stones.into_iter()
    }

    /// Bounding box of all stones, or None for an empty board.
    pub fn bounds(&self) -> Option<Region> {
        let mut stones = self.stones.iter();
        let first = *stones.next()?;
        let mut region = Region::new(first, first);
        for p in stones {
            region.min.col = region.min.col.min(p.col);
            region.min.row = region.min.row.min(p.row);
            region.max.col = region.max.col.max(p.col);
            region.max.row = region.max.row.max(p.row);
        }
        Some(region)
    }

    /// Empty in-bounds points within four steps of a stone along any direction.
    ///
    /// Only these can complete a line, so terminal scans visit this set
    /// instead of the bounding box, whose area is unbounded in stone count.
    pub fn frontier(&self) -> HashSet<Point> {
        let reach = LINE_LEN as i32 - 1;
        let mut points = HashSet::new();
        for &stone in &self.stones {
            for dir in Direction::ALL {
                for k in (-reach..=reach).filter(|&k| k != 0) {
                    let q = stone.step(dir, k);
                    if Board::is_in_bounds(q) && !self.is_occupied(q) {
                        points.insert(q);
                    }
                }
            }
        }
        points
    }

    // ========== Line Detection ==========

    /// Find every 5-window through `p`, treating `p` itself as occupied.
    ///
    /// For each direction the contiguous run through `p` is followed up to
    /// 9 stones each way. Every 5-window of a run of length >= 5 that
    /// contains `p` is returned, in direction order then window order.
    /// The board is never touched, so a hypothetical stone cannot leak.
    pub fn find_lines_through(&self, p: Point) -> Vec<Line> {
        let mut found: Vec<Line> = Vec::new();
        for dir in Direction::ALL {
            let run = self.run_through(p, dir);
            if run.len() < LINE_LEN {
                continue;
            }
            for window in run.windows(LINE_LEN) {
                if !window.contains(&p) {
                    continue;
                }
                let line = Line::from_start(window[0], dir);
                if !found.contains(&line) {
                    found.push(line);
                }
            }
        }
        found
    }

    /// Contiguous run through `p` along `dir`, negative end first.
    fn run_through(&self, p: Point, dir: Direction) -> Vec<Point> {
        let mut run: Vec<Point> = (1..=MAX_WALK)
            .map(|k| p.step(dir, -k))
            .take_while(|&q| self.is_occupied(q))
            .collect();
        run.reverse();
        run.push(p);
        run.extend(
            (1..=MAX_WALK)
                .map(|k| p.step(dir, k))
                .take_while(|&q| self.is_occupied(q)),
        );
        run
    }
}

impl FromIterator<Point> for Board {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Board {
        Board {
            stones: iter.into_iter().collect(),
        }
    }
}

// ========== Overlap Resolution ==========

/// Filter freshly detected lines down to those that may be scored now.
///
/// Candidates are taken in order. A candidate already in `scored` is
/// skipped; otherwise it is rejected on the first conflict with a scored
/// line, then with a candidate accepted earlier in this batch.
pub fn accept_lines(candidates: &[Line], scored: &[Line], allowed: Point) -> Vec<Line> {
    let mut accepted: Vec<Line> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if scored.contains(candidate) {
            continue;
        }
        if scored.iter().any(|s| candidate.conflicts_with(s, allowed)) {
            continue;
        }
        if accepted.iter().any(|a| candidate.conflicts_with(a, allowed)) {
            continue;
        }
        accepted.push(*candidate);
    }
    accepted
}

// ========== Start Pattern ==========

/// The 36-stone cross the game starts from.
const CROSS: [(i32, i32); 36] = [
    (14, 10), (15, 10), (16, 10), (17, 10), (17, 11), (17, 12),
    (17, 13), (18, 13), (19, 13), (20, 13), (20, 14), (20, 15),
    (20, 16), (19, 16), (18, 16), (17, 16), (17, 17), (17, 18),
    (17, 19), (16, 19), (15, 19), (14, 19), (14, 18), (14, 17),
    (14, 16), (13, 16), (12, 16), (11, 16), (11, 15), (11, 14),
    (11, 13), (12, 13), (13, 13), (14, 13), (14, 12), (14, 11),
];

/// Starting stone layout, centred on a caller-chosen origin when applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPattern {
    points: Vec<Point>,
}

impl StartPattern {
    pub fn new(points: Vec<Point>) -> StartPattern {
        StartPattern { points }
    }

    /// The classic cross.
    pub fn cross() -> StartPattern {
        StartPattern::new(CROSS.iter().map(|&p| Point::from(p)).collect())
    }

    /// Empty layout (useful for puzzles and tests).
    pub fn empty() -> StartPattern {
        StartPattern::new(Vec::new())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Shift the pattern so its bounding box is centred on `origin`.
    ///
    /// Matches the layout rule `origin - floor(size / 2) - min` per axis.
    /// Points that land outside the grid are dropped.
    pub fn placed_at(&self, origin: Point) -> Vec<Point> {
        let bounds = match self.points.iter().copied().collect::<Board>().bounds() {
            Some(bounds) => bounds,
            None => return Vec::new(),
        };
        let (min_col, min_row) = (i64::from(bounds.min.col), i64::from(bounds.min.row));
        let width = i64::from(bounds.max.col) - min_col + 1;
        let height = i64::from(bounds.max.row) - min_row + 1;
        let left = i64::from(origin.col) - width / 2 - min_col;
        let top = i64::from(origin.row) - height / 2 - min_row;
        self.points
            .iter()
            .filter_map(|p| {
                let col = i32::try_from(left + i64::from(p.col)).ok()?;
                let row = i32::try_from(top + i64::from(p.row)).ok()?;
                Some(Point::new(col, row))
            })
            .filter(|&p| Board::is_in_bounds(p))
            .collect()
    }
}

impl Default for StartPattern {
    fn default() -> Self {
        Self::cross()
    }
}
