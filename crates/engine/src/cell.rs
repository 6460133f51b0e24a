//! Cell content model.
//!
//! A cell is exactly one of Empty, Text, or Formula: a closed sum type, so
//! every operation dispatches exhaustively. A Formula cell owns the parsed
//! formula plus a single-slot evaluation cache; the cache is the one mutable
//! field outside `set`/`clear`, written only by lazy evaluation and cleared
//! only by invalidation. Interior mutability is sound here because the
//! engine is single-threaded and evaluation is a read-only recursion.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::FormulaError;
use crate::formula::{CellLookup, Formula};
use crate::position::Position;

/// The reserved leading character that switches a cell into formula mode.
pub const FORMULA_MARKER: char = '=';

/// Leading apostrophe forces text interpretation and is stripped from the
/// value (but not the text) of the cell.
pub const TEXT_ESCAPE: char = '\'';

/// What reading a cell produces: text, a number, or a typed evaluation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Discriminant of a cell's content state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Text,
    Formula,
}

#[derive(Debug, Default)]
enum CellContent {
    #[default]
    Empty,
    Text(String),
    Formula {
        formula: Formula,
        cache: RefCell<Option<CellValue>>,
    },
}

impl CellContent {
    /// Three-way classification of raw input text.
    ///
    /// Empty string is an empty cell; the formula marker followed by at
    /// least one character parses as a formula; everything else (including
    /// a lone marker) is text.
    fn classify(text: &str) -> Result<CellContent, String> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        if let Some(body) = text.strip_prefix(FORMULA_MARKER) {
            if !body.is_empty() {
                let formula = Formula::parse(body)?;
                return Ok(CellContent::Formula {
                    formula,
                    cache: RefCell::new(None),
                });
            }
        }
        Ok(CellContent::Text(text.to_string()))
    }
}

/// A single cell of the sheet.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> CellKind {
        match self.content {
            CellContent::Empty => CellKind::Empty,
            CellContent::Text(_) => CellKind::Text,
            CellContent::Formula { .. } => CellKind::Formula,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Replace content from raw input text.
    ///
    /// On a formula parse failure the cell is left untouched and the error
    /// is returned for the sheet to report.
    pub fn set(&mut self, text: &str) -> Result<(), String> {
        self.content = CellContent::classify(text)?;
        Ok(())
    }

    /// Reset to Empty, dropping any formula and cache.
    pub fn clear(&mut self) {
        self.content = CellContent::Empty;
    }

    /// The cell's value: empty text for Empty, the apostrophe-stripped
    /// string for Text, and the cached-or-evaluated result for Formula.
    ///
    /// Evaluation never fails the call; errors come back as
    /// `CellValue::Error`. The result is stored in the cache slot so repeat
    /// reads are served without re-evaluating.
    pub fn value(&self, lookup: &dyn CellLookup) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Text(String::new()),
            CellContent::Text(s) => {
                let stripped = s.strip_prefix(TEXT_ESCAPE).unwrap_or(s);
                CellValue::Text(stripped.to_string())
            }
            CellContent::Formula { formula, cache } => {
                if let Some(cached) = cache.borrow().as_ref() {
                    return cached.clone();
                }
                let value = match formula.evaluate(lookup) {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                };
                *cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The cell's text: raw stored string for Text (escape included), the
    /// marker plus the canonical expression for Formula.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula { formula, .. } => {
                format!("{}{}", FORMULA_MARKER, formula.expression())
            }
        }
    }

    /// Distinct positions this cell's formula reads; empty for Empty/Text.
    pub fn referenced_cells(&self) -> &[Position] {
        match &self.content {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => &[],
        }
    }

    /// Drop the cached value, forcing recomputation on the next read.
    /// No-op for Empty/Text, which are trivially "cached".
    pub fn invalidate_cache(&self) {
        if let CellContent::Formula { cache, .. } = &self.content {
            cache.borrow_mut().take();
        }
    }

    /// True when the next read will be served without evaluation.
    pub fn is_cached(&self) -> bool {
        match &self.content {
            CellContent::Formula { cache, .. } => cache.borrow().is_some(),
            _ => true,
        }
    }
}
