//! Formula parsing and evaluation.
//!
//! `Formula` is the boundary the cell model sees: parse once, then evaluate
//! against a lookup, re-render the canonical expression text, or list the
//! cells the expression reads.

pub mod eval;
pub mod parser;
pub mod refs;

pub use eval::CellLookup;

use crate::error::FormulaError;
use crate::position::Position;

/// A parsed formula: the AST plus its precomputed reference list.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: parser::Expr,
    refs: Vec<Position>,
}

impl Formula {
    /// Parse the body of a formula (the text after the leading marker).
    ///
    /// Failure is reported to the caller; there is no silent fallback to a
    /// text cell.
    pub fn parse(source: &str) -> Result<Formula, String> {
        let expr = parser::parse(source)?;
        let refs = refs::extract_refs(&expr);
        Ok(Formula { expr, refs })
    }

    /// Evaluate to a number or a typed error value.
    pub fn evaluate(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        eval::evaluate(&self.expr, lookup)
    }

    /// Canonical textual form of the parsed expression, without the marker.
    pub fn expression(&self) -> String {
        self.expr.render()
    }

    /// Distinct positions the expression reads, in first-occurrence order.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }
}
