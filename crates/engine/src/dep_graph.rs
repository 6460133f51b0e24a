//! Dependency graph for formula cells.
//!
//! Tracks precedents (cells a formula reads) and dependents (cells whose
//! formulas read a given cell) so that a mutation can be cycle-checked
//! before it commits and cache invalidation can follow the dependents
//! relation transitively.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (A is a precedent of B)
//! ```
//!
//! This makes "what goes stale if I change X?" trivial: follow outgoing edges.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

/// Dependency graph over cell positions.
///
/// Maintains bidirectional adjacency for O(1) lookups:
/// - `preds[B]` = cells that B's formula reads (precedents)
/// - `succs[A]` = cells whose formulas read A (dependents)
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** If A ∈ preds[B] then B ∈ succs[A], and vice versa.
/// 2. **No dangling entries:** Empty sets are removed, not stored.
/// 3. **No duplicate edges:** Set semantics enforced by FxHashSet.
/// 4. **Acyclic after commit:** The sheet only calls `replace_edges` with
///    reference sets that passed `would_create_cycle`.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// Precedents: for each formula cell B, the cells A it reads. B -> {A1, A2, ...}
    preds: FxHashMap<Position, FxHashSet<Position>>,

    /// Dependents: for each referenced cell A, the formula cells B reading it. A -> {B1, B2, ...}
    succs: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cells this formula cell reads (precedents).
    pub fn precedents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.preds
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Returns the cells whose formulas read this cell (dependents).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.succs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Returns true if this cell has formula dependencies tracked in the graph.
    pub fn is_formula_cell(&self, cell: Position) -> bool {
        self.preds.contains_key(&cell)
    }

    /// Returns the number of formula cells (cells with precedents) in the graph.
    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Returns the number of cells that are referenced by at least one formula.
    pub fn referenced_cell_count(&self) -> usize {
        self.succs.len()
    }

    /// Replace all edges for a formula cell atomically.
    ///
    /// This is the only mutation API. It:
    /// 1. Removes the cell from all its old precedents' dependent sets
    /// 2. Clears the cell's precedent set
    /// 3. Adds the cell to all new precedents' dependent sets
    /// 4. Stores the cell's new precedent set
    ///
    /// Pass an empty set to clear all edges for this cell (cell is no longer
    /// a formula, or was cleared). Recomputing from scratch on every set is
    /// what keeps edges from a cell's previous formula from lingering.
    pub fn replace_edges(&mut self, formula_cell: Position, new_preds: FxHashSet<Position>) {
        if let Some(old_preds) = self.preds.remove(&formula_cell) {
            for pred in old_preds {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(&formula_cell);
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if new_preds.is_empty() {
            return;
        }

        for pred in &new_preds {
            self.succs.entry(*pred).or_default().insert(formula_cell);
        }

        self.preds.insert(formula_cell, new_preds);
    }

    /// Clear all edges for a cell (formula replaced by plain content, or cell cleared).
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Check if pointing `cell` at `new_preds` would create a cycle.
    ///
    /// Does not modify the graph. Returns `Some(CycleReport)` if a cycle
    /// would be introduced, `None` otherwise.
    ///
    /// # Algorithm
    ///
    /// A cycle is created iff some member of `new_preds` is reachable from
    /// `cell` by following dependent edges (then `new_pred → ... → cell →
    /// new_pred` closes the loop), or `cell` references itself. Iterative
    /// DFS with a visited set, so large acyclic graphs terminate in
    /// O(reachable edges).
    pub fn would_create_cycle(&self, cell: Position, new_preds: &[Position]) -> Option<CycleReport> {
        if new_preds.contains(&cell) {
            return Some(CycleReport::self_reference(cell));
        }

        let new_preds_set: FxHashSet<Position> = new_preds.iter().copied().collect();
        let mut visited = FxHashSet::default();
        let mut stack = vec![cell];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            if let Some(deps) = self.succs.get(&current) {
                for &dep in deps {
                    if new_preds_set.contains(&dep) {
                        return Some(CycleReport::cycle(vec![dep, cell]));
                    }
                    stack.push(dep);
                }
            }
        }

        None
    }

    /// The cell itself plus every cell transitively depending on it, in
    /// traversal order (the cell first).
    ///
    /// This is the invalidation set for a mutation at `start`. The walk
    /// keeps a visited set, so it terminates even on a graph that somehow
    /// holds a cycle, and each reachable cell appears exactly once.
    pub fn transitive_dependents(&self, start: Position) -> Vec<Position> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);

            if let Some(deps) = self.succs.get(&current) {
                stack.extend(deps.iter().copied());
            }
        }

        order
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (formula_cell, preds) in &self.preds {
            for pred in preds {
                assert!(
                    self.succs.get(pred).is_some_and(|s| s.contains(formula_cell)),
                    "Missing succ edge: {:?} should have {:?} in dependents",
                    pred,
                    formula_cell
                );
            }
        }

        for (cell, dependents) in &self.succs {
            for dep in dependents {
                assert!(
                    self.preds.get(dep).is_some_and(|s| s.contains(cell)),
                    "Missing pred edge: {:?} should have {:?} in precedents",
                    dep,
                    cell
                );
            }
        }

        for (cell, preds) in &self.preds {
            assert!(!preds.is_empty(), "Empty preds set stored for {:?}", cell);
        }
        for (cell, succs) in &self.succs {
            assert!(!succs.is_empty(), "Empty succs set stored for {:?}", cell);
        }
    }
}

/// Report produced when cycle detection finds a circular reference.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cells participating in the cycle. May be a subset for large cycles.
    pub cells: Vec<Position>,

    /// Human-readable description of the cycle.
    pub message: String,
}

impl CycleReport {
    /// Create a cycle report for a self-referencing cell.
    pub fn self_reference(cell: Position) -> Self {
        Self {
            cells: vec![cell],
            message: format!("cell {} references itself", cell),
        }
    }

    /// Create a cycle report for a multi-cell cycle.
    pub fn cycle(cells: Vec<Position>) -> Self {
        let names: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let message = format!("circular reference: {}", names.join(" -> "));
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CycleReport {}
