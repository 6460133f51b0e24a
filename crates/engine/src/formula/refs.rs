//! Reference extraction from a parsed formula.
//!
//! Positions are deduplicated in first-occurrence order. The order is
//! stable (two extractions of the same expression agree) but carries no
//! other meaning; callers must not rely on it being sorted.

use rustc_hash::FxHashSet;

use crate::position::Position;

use super::parser::Expr;

/// Collect the distinct cell positions an expression reads.
pub fn extract_refs(expr: &Expr) -> Vec<Position> {
    let mut seen = FxHashSet::default();
    let mut refs = Vec::new();
    collect_refs(expr, &mut seen, &mut refs);
    refs
}

fn collect_refs(expr: &Expr, seen: &mut FxHashSet<Position>, refs: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::CellRef(pos) => {
            if seen.insert(*pos) {
                refs.push(*pos);
            }
        }
        Expr::UnaryOp { operand, .. } => collect_refs(operand, seen, refs),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, seen, refs);
            collect_refs(right, seen, refs);
        }
    }
}
