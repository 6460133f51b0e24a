//! Error types for sheet operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dep_graph::CycleReport;
use crate::position::Position;

/// Errors reported by the structural sheet API.
///
/// These abort the triggering operation with no partial effect. Evaluation
/// errors are deliberately not here: a formula that divides by zero holds a
/// legitimate cell *value* (`FormulaError`), not a failed operation.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Position fails static bounds validation.
    #[error("invalid position ({}, {})", .0.row, .0.col)]
    InvalidPosition(Position),

    /// The proposed formula would create a cycle in the dependency graph.
    #[error("{0}")]
    CircularDependency(CycleReport),

    /// Formula text failed to parse. The target cell is unchanged.
    #[error("formula parse error: {0}")]
    FormulaParse(String),
}

/// Typed evaluation error a formula cell can hold and return as a value.
///
/// Flows through the normal value channel, never as a `SheetError`:
/// a dependent formula that reads an error cell yields the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    /// Reference to a cell outside the addressable grid.
    Ref,
    /// A referenced cell's text cannot be coerced to a number.
    Value,
    /// Division by zero or other non-finite arithmetic result.
    Div0,
}

impl FormulaError {
    /// The fixed display token for this error category.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
