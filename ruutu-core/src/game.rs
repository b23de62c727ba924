//! Placement rule engine: the state machine of one game session.
//!
//! ```text
//!            place (no line, bonus > 0)
//!   Idle  ------------------------------>  AwaitingBonusSecond { first }
//!    ^                                              |
//!    |   second placement scores (stones kept)      |
//!    +----------------------------------------------+
//!    |   second placement fails (both stones gone,  |
//!    |   bonus refunded)                            |
//!    +----------------------------------------------+
//! ```
//!
//! The session is over once no bonus credit is left, no bonus attempt is
//! pending and no empty intersection near the stones could complete a new
//! line. An integrity violation halts the session until `reset()`.

use std::collections::HashSet;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::highscore::{LineKey, ScoreSubmission};
use crate::{accept_lines, Board, Line, Point, Region, StartPattern};

/// Margin around the stones scanned for possible lines.
const SCAN_MARGIN: i32 = 2;

/// Bonus bookkeeping state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Phase {
    /// No bonus attempt in progress.
    Idle,
    /// A provisional stone was placed with a bonus credit; the next
    /// placement decides whether it stays.
    AwaitingBonusSecond { first: Point },
}

/// Session status.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Status {
    Playing,
    GameOver,
    /// Frozen after an integrity violation.
    Halted,
}

/// Why a placement was refused. Nothing is mutated on refusal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Serialize, Deserialize)]
pub enum Rejection {
    #[display("point is outside the grid")]
    OutOfBounds,
    #[display("point is already occupied")]
    Occupied,
    #[display("placement forms no new line and no bonus is available")]
    IllegalMove,
    #[display("game is over")]
    GameOver,
}

impl Rejection {
    /// Out of bounds or occupied: the target point itself is unusable.
    pub fn is_invalid_placement(self) -> bool {
        matches!(self, Rejection::OutOfBounds | Rejection::Occupied)
    }
}

/// Fatal engine errors. Expected refusals are [`Rejection`] values instead.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
pub enum EngineError {
    #[display("integrity violation: {reason}")]
    IntegrityViolation { reason: String },
    #[display("session halted after an integrity violation")]
    Halted,
}

/// What a single `place_stone` call did.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    /// New lines were recorded.
    Scored {
        lines: Vec<Line>,
        /// A bonus credit was granted for scoring two or more lines at once.
        bonus_awarded: bool,
        /// The placement resolved a pending bonus attempt.
        completed_bonus: bool,
    },
    /// A bonus credit was spent on a provisional stone.
    Provisional,
    /// The bonus attempt failed: both stones were removed and the credit refunded.
    BonusFailed { removed: [Point; 2] },
    Rejected(Rejection),
}

/// Result of a placement attempt.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Placement {
    pub outcome: Outcome,
    /// True when the game is over after this call.
    pub game_over: bool,
}

impl Placement {
    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, Outcome::Rejected(_))
    }
}

/// Hover preview for an intersection.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Preview {
    /// Placing here would score these lines.
    Lines(Vec<Line>),
    /// Placing here would spend a bonus credit on a provisional stone.
    Bonus,
    Nothing,
}

/// Serializable engine state for saving and resuming a session.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub stones: Vec<Point>,
    pub lines: Vec<Line>,
    pub score: u32,
    pub bonus: u32,
    #[serde(default)]
    pub first_placement: Option<Point>,
}

/// One game session. Owns the board, the scored lines and all counters.
#[derive(Clone, Debug)]
pub struct Game {
    board: Board,
    scored: Vec<Line>,
    score: u32,
    bonus: u32,
    phase: Phase,
    status: Status,
    pattern: StartPattern,
    origin: Point,
}

impl Game {
    /// Start a game from the classic cross centred on the origin.
    pub fn new() -> Game {
        Game::with_pattern(StartPattern::cross(), Point::ORIGIN)
    }

    /// Start a game from `pattern` centred on `origin`.
    pub fn with_pattern(pattern: StartPattern, origin: Point) -> Game {
        let mut game = Game {
            board: Board::new(),
            scored: Vec::new(),
            score: 0,
            bonus: 0,
            phase: Phase::Idle,
            status: Status::Playing,
            pattern,
            origin,
        };
        game.reset();
        game
    }

    /// Clear everything and reapply the start pattern. Also lifts a halt.
    pub fn reset(&mut self) {
        self.board = self.pattern.placed_at(self.origin).into_iter().collect();
        self.scored.clear();
        self.score = 0;
        self.bonus = 0;
        self.phase = Phase::Idle;
        self.status = Status::Playing;
        self.refresh_status();
        debug!(stones = self.board.len(), "game reset");
    }

    // ========== Accessors ==========

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Scored lines in the order they were recorded.
    pub fn scored_lines(&self) -> &[Line] {
        &self.scored
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn bonus(&self) -> u32 {
        self.bonus
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn awaiting_bonus_second(&self) -> bool {
        matches!(self.phase, Phase::AwaitingBonusSecond { .. })
    }

    /// The provisional stone of a pending bonus attempt, if any.
    pub fn first_placement(&self) -> Option<Point> {
        match self.phase {
            Phase::AwaitingBonusSecond { first } => Some(first),
            Phase::Idle => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.status == Status::GameOver
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    // ========== Placement ==========

    /// Try to place a stone at `p`.
    ///
    /// Refusals come back as [`Outcome::Rejected`]; only a broken
    /// score/line invariant or a halted session is an error.
    pub fn place_stone(&mut self, p: Point) -> Result<Placement, EngineError> {
        match self.status {
            Status::Halted => return Err(EngineError::Halted),
            Status::GameOver => return Ok(self.rejected(p, Rejection::GameOver)),
            Status::Playing => {}
        }
        if !Board::is_in_bounds(p) {
            return Ok(self.rejected(p, Rejection::OutOfBounds));
        }
        if self.board.is_occupied(p) {
            return Ok(self.rejected(p, Rejection::Occupied));
        }

        let accepted = self.acceptable_lines_at(p);
        let outcome = if !accepted.is_empty() {
            let completed_bonus = self.awaiting_bonus_second();
            self.board.place(p);
            self.phase = Phase::Idle;
            self.record(accepted, completed_bonus)
        } else {
            match self.phase {
                Phase::Idle if self.bonus == 0 => {
                    return Ok(self.rejected(p, Rejection::IllegalMove));
                }
                Phase::Idle => {
                    self.board.place(p);
                    self.bonus -= 1;
                    self.phase = Phase::AwaitingBonusSecond { first: p };
                    debug!(point = %p, bonus = self.bonus, "provisional stone placed");
                    Outcome::Provisional
                }
                Phase::AwaitingBonusSecond { first } => self.resolve_bonus_second(first, p),
            }
        };

        self.verify_integrity()?;
        let game_over = self.refresh_status();
        Ok(Placement { outcome, game_over })
    }

    /// Second stone of a bonus attempt that did not score on its own.
    ///
    /// The attempt fails: `first` is removed, `second` is never committed
    /// and the credit is refunded. Nothing through `first` can score here:
    /// a line through both stones was already searched through `second`,
    /// and `first` alone completed nothing when it was placed.
    fn resolve_bonus_second(&mut self, first: Point, second: Point) -> Outcome {
        self.board.remove(first);
        self.phase = Phase::Idle;
        self.bonus += 1;
        debug!(first = %first, second = %second, bonus = self.bonus, "bonus attempt failed");
        Outcome::BonusFailed { removed: [first, second] }
    }

    /// Append newly accepted lines and update the counters.
    fn record(&mut self, lines: Vec<Line>, completed_bonus: bool) -> Outcome {
        let count = lines.len() as u32;
        self.scored.extend(lines.iter().copied());
        self.score += count;
        let bonus_awarded = count >= 2;
        if bonus_awarded {
            self.bonus += 1;
        }
        info!(
            lines = count,
            score = self.score,
            bonus = self.bonus,
            bonus_awarded,
            "lines scored"
        );
        Outcome::Scored {
            lines,
            bonus_awarded,
            completed_bonus,
        }
    }

    fn rejected(&self, p: Point, reason: Rejection) -> Placement {
        debug!(point = %p, %reason, "placement rejected");
        Placement {
            outcome: Outcome::Rejected(reason),
            game_over: self.is_game_over(),
        }
    }

    /// Lines a stone at `p` would score right now.
    fn acceptable_lines_at(&self, p: Point) -> Vec<Line> {
        accept_lines(&self.board.find_lines_through(p), &self.scored, p)
    }

    // ========== Preview ==========

    /// What placing at `p` would do, without changing anything.
    pub fn preview(&self, p: Point) -> Preview {
        if self.status != Status::Playing || !Board::is_in_bounds(p) || self.board.is_occupied(p) {
            return Preview::Nothing;
        }
        let lines = self.acceptable_lines_at(p);
        if !lines.is_empty() {
            Preview::Lines(lines)
        } else if self.bonus > 0 && self.phase == Phase::Idle {
            Preview::Bonus
        } else {
            Preview::Nothing
        }
    }

    // ========== Terminal Detection ==========

    /// Bounding box of the stones grown by a small margin, for renderers
    /// that want a default viewport. Terminal scans do not walk it.
    pub fn scan_region(&self) -> Option<Region> {
        self.board.bounds().map(|b| b.expand(SCAN_MARGIN))
    }

    /// Check whether any empty intersection near the stones would score.
    ///
    /// Visits the board frontier only, so the cost follows the stone count
    /// however far apart the stones are.
    pub fn has_any_possible_line(&self) -> bool {
        self.board
            .frontier()
            .into_iter()
            .any(|p| !self.acceptable_lines_at(p).is_empty())
    }

    /// Same as [`Game::has_any_possible_line`] restricted to `region`.
    pub fn has_any_possible_line_in(&self, region: Region) -> bool {
        self.frontier_in(region)
            .any(|p| !self.acceptable_lines_at(p).is_empty())
    }

    /// Number of distinct new lines available from single placements.
    pub fn count_possible_lines(&self) -> usize {
        self.count_lines_from(self.board.frontier().into_iter())
    }

    pub fn count_possible_lines_in(&self, region: Region) -> usize {
        self.count_lines_from(self.frontier_in(region))
    }

    fn count_lines_from(&self, points: impl Iterator<Item = Point>) -> usize {
        let mut keys: HashSet<Line> = HashSet::new();
        for p in points {
            keys.extend(self.acceptable_lines_at(p));
        }
        keys.len()
    }

    fn frontier_in(&self, region: Region) -> impl Iterator<Item = Point> {
        self.board
            .frontier()
            .into_iter()
            .filter(move |&p| region.contains(p))
    }

    /// Re-evaluate the terminal condition. Returns true when the game is over.
    fn refresh_status(&mut self) -> bool {
        if self.status == Status::Playing
            && self.bonus == 0
            && self.phase == Phase::Idle
            && !self.has_any_possible_line()
        {
            self.status = Status::GameOver;
            info!(score = self.score, lines = self.scored.len(), "game over");
        }
        self.is_game_over()
    }

    // ========== Integrity ==========

    /// Check the canonical-score invariant. A violation halts the session.
    pub fn verify_integrity(&mut self) -> Result<(), EngineError> {
        if let Some(reason) = self.inconsistency() {
            warn!(%reason, "integrity violation, halting session");
            self.status = Status::Halted;
            return Err(EngineError::IntegrityViolation { reason });
        }
        Ok(())
    }

    fn inconsistency(&self) -> Option<String> {
        if self.score as usize != self.scored.len() {
            return Some(format!(
                "score {} does not match {} scored lines",
                self.score,
                self.scored.len()
            ));
        }
        if let Some(p) = self.board.iter().find(|&p| !Board::is_in_bounds(p)) {
            return Some(format!("stone {} is outside the grid", p));
        }
        let mut seen: HashSet<&Line> = HashSet::with_capacity(self.scored.len());
        for line in &self.scored {
            if !seen.insert(line) {
                return Some(format!("line {} recorded twice", line));
            }
            if *line != Line::from_start(line.start(), line.direction()) {
                return Some(format!("line {} is not five adjacent points", line));
            }
            if let Some(p) = line.points().iter().find(|&&p| !self.board.is_occupied(p)) {
                return Some(format!("line {} has no stone at {}", line, p));
            }
        }
        if let Some(first) = self.first_placement() {
            if !self.board.is_occupied(first) {
                return Some(format!("provisional stone {} is missing", first));
            }
        }
        None
    }

    // ========== Snapshots & Submission ==========

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            stones: self.board.iter().collect(),
            lines: self.scored.clone(),
            score: self.score,
            bonus: self.bonus,
            first_placement: self.first_placement(),
        }
    }

    /// Replace the session state with `snapshot`.
    ///
    /// An inconsistent snapshot halts the session and returns the violation.
    pub fn load(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        self.board = snapshot.stones.into_iter().collect();
        self.scored = snapshot.lines;
        self.score = snapshot.score;
        self.bonus = snapshot.bonus;
        self.phase = match snapshot.first_placement {
            Some(first) => Phase::AwaitingBonusSecond { first },
            None => Phase::Idle,
        };
        self.status = Status::Playing;
        self.verify_integrity()?;
        self.refresh_status();
        Ok(())
    }

    /// Final score and line keys for the persistence gateway.
    pub fn submission(&self) -> Result<ScoreSubmission, EngineError> {
        if self.is_halted() {
            return Err(EngineError::Halted);
        }
        if let Some(reason) = self.inconsistency() {
            return Err(EngineError::IntegrityViolation { reason });
        }
        Ok(ScoreSubmission {
            score: self.score,
            lines: self
                .scored
                .iter()
                .map(|line| LineKey { key: line.key() })
                .collect(),
        })
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
