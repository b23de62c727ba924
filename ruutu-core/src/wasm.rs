//! WASM bindings for ruutu-core
//!
//! Provides a JavaScript-friendly API for the rule engine. The page keeps
//! doing the drawing; every decision comes from here.

use wasm_bindgen::prelude::*;

use crate::{Game, Outcome, Point, Preview, Snapshot, StartPattern};

/// WASM-friendly wrapper around Game
#[wasm_bindgen]
pub struct WasmGame {
    inner: Game,
}

#[wasm_bindgen]
impl WasmGame {
    /// Start from the classic cross centred on (col, row)
    #[wasm_bindgen(constructor)]
    pub fn new(col: i32, row: i32) -> WasmGame {
        WasmGame {
            inner: Game::with_pattern(StartPattern::cross(), Point::new(col, row)),
        }
    }

    /// Start from a flat [col, row, col, row, ...] list centred on (col, row)
    #[wasm_bindgen(js_name = withPattern)]
    pub fn with_pattern(coords: Vec<i32>, col: i32, row: i32) -> WasmGame {
        let points = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();
        WasmGame {
            inner: Game::with_pattern(StartPattern::new(points), Point::new(col, row)),
        }
    }

    /// Place a stone. Returns the placement as a JS object:
    /// { outcome: ..., game_over: bool }
    #[wasm_bindgen(js_name = placeStone)]
    pub fn place_stone(&mut self, col: i32, row: i32) -> Result<JsValue, JsValue> {
        let placement = self
            .inner
            .place_stone(Point::new(col, row))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_wasm_bindgen::to_value(&placement)?)
    }

    /// Hover preview: "line", "bonus" or "none"
    #[wasm_bindgen(js_name = previewKind)]
    pub fn preview_kind(&self, col: i32, row: i32) -> String {
        match self.inner.preview(Point::new(col, row)) {
            Preview::Lines(_) => "line".to_string(),
            Preview::Bonus => "bonus".to_string(),
            Preview::Nothing => "none".to_string(),
        }
    }

    /// Lines a placement at (col, row) would score, as
    /// [startCol, startRow, endCol, endRow, ...]
    #[wasm_bindgen(js_name = previewLines)]
    pub fn preview_lines(&self, col: i32, row: i32) -> Vec<i32> {
        match self.inner.preview(Point::new(col, row)) {
            Preview::Lines(lines) => lines
                .iter()
                .flat_map(|l| [l.start().col, l.start().row, l.end().col, l.end().row])
                .collect(),
            _ => vec![],
        }
    }

    /// Scored lines as [startCol, startRow, endCol, endRow, ...] in scoring order
    #[wasm_bindgen(js_name = scoredLines)]
    pub fn scored_lines(&self) -> Vec<i32> {
        self.inner
            .scored_lines()
            .iter()
            .flat_map(|l| [l.start().col, l.start().row, l.end().col, l.end().row])
            .collect()
    }

    /// Stones as [col, row, col, row, ...]
    pub fn stones(&self) -> Vec<i32> {
        self.inner.board().iter().flat_map(|p| [p.col, p.row]).collect()
    }

    pub fn score(&self) -> u32 {
        self.inner.score()
    }

    pub fn bonus(&self) -> u32 {
        self.inner.bonus()
    }

    /// Whether a provisional (orange) stone is waiting for its partner
    #[wasm_bindgen(js_name = awaitingBonusSecond)]
    pub fn awaiting_bonus_second(&self) -> bool {
        self.inner.awaiting_bonus_second()
    }

    /// Provisional stone as [col, row], empty if none
    #[wasm_bindgen(js_name = firstPlacement)]
    pub fn first_placement(&self) -> Vec<i32> {
        self.inner
            .first_placement()
            .map(|p| vec![p.col, p.row])
            .unwrap_or_default()
    }

    /// Distinct new lines currently reachable with one stone
    #[wasm_bindgen(js_name = possibleLines)]
    pub fn possible_lines(&self) -> usize {
        self.inner.count_possible_lines()
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    #[wasm_bindgen(js_name = isHalted)]
    pub fn is_halted(&self) -> bool {
        self.inner.is_halted()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Payload for POST /api/highscores
    pub fn submission(&self) -> Result<JsValue, JsValue> {
        let submission = self
            .inner
            .submission()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_wasm_bindgen::to_value(&submission)?)
    }

    /// Save the session as a JS object
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.snapshot())?)
    }

    /// Resume a saved session. Fails (and halts) on an inconsistent snapshot.
    pub fn load(&mut self, snapshot: JsValue) -> Result<(), JsValue> {
        let snapshot: Snapshot = serde_wasm_bindgen::from_value(snapshot)?;
        self.inner
            .load(snapshot)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Default for WasmGame {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Short outcome tag for logging on the JS side
#[wasm_bindgen(js_name = outcomeTag)]
pub fn outcome_tag(placement: JsValue) -> Result<String, JsValue> {
    let placement: crate::Placement = serde_wasm_bindgen::from_value(placement)?;
    let tag = match placement.outcome {
        Outcome::Scored { .. } => "scored",
        Outcome::Provisional => "provisional",
        Outcome::BonusFailed { .. } => "bonus_failed",
        Outcome::Rejected(_) => "rejected",
    };
    Ok(tag.to_string())
}
