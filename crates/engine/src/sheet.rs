//! The sheet: grid container and mutation orchestration.
//!
//! Owns all cells, the dependency graph, and the per-row/per-column
//! occupancy counters that make the printable size an O(log n) query.
//! `set_cell` is the one complex entry point; it stages the new content,
//! cycle-checks it against the graph, and only then commits, so a rejected
//! mutation has no visible effect.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::cell::{Cell, CellKind, CellValue};
use crate::dep_graph::DepGraph;
use crate::error::SheetError;
use crate::formula::CellLookup;
use crate::position::{Position, Size};

#[derive(Debug, Default)]
pub struct Sheet {
    /// Sparse backing store: a position is present once it has been touched
    /// by `set_cell`, and stays present (as Empty) after `clear_cell`.
    cells: HashMap<Position, Cell>,
    /// Non-empty cell count per occupied row; zero entries are dropped.
    row_counts: BTreeMap<usize, usize>,
    /// Non-empty cell count per occupied column; zero entries are dropped.
    col_counts: BTreeMap<usize, usize>,
    deps: DepGraph,
}

/// Read-only lookup capability handed to formula evaluation.
///
/// This is how a formula resolves other cells' values: a same-thread,
/// read-only recursion through the sheet, not a stored back-reference.
struct SheetLookup<'a> {
    sheet: &'a Sheet,
}

impl CellLookup for SheetLookup<'_> {
    fn cell_value(&self, pos: Position) -> CellValue {
        match self.sheet.cells.get(&pos) {
            Some(cell) => cell.value(self),
            None => CellValue::Text(String::new()),
        }
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell's content from raw input text.
    ///
    /// The mutation is a transaction: bounds are validated first, the new
    /// content is parsed and cycle-checked before anything is touched, and
    /// only a clean mutation commits. On success every transitive dependent
    /// of `pos` has its cache invalidated.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.in_bounds() {
            return Err(SheetError::InvalidPosition(pos));
        }

        // Stage the new content without touching the sheet, so parse
        // failures and rejected cycles leave no trace.
        let mut staged = Cell::new();
        staged.set(text).map_err(SheetError::FormulaParse)?;

        if staged.kind() == CellKind::Formula {
            if let Some(report) = self.deps.would_create_cycle(pos, staged.referenced_cells()) {
                return Err(SheetError::CircularDependency(report));
            }
        }

        // Commit.
        let preds: FxHashSet<Position> = staged.referenced_cells().iter().copied().collect();
        let was_occupied = self.cells.get(&pos).is_some_and(|c| !c.is_empty());
        let now_occupied = !staged.is_empty();

        self.cells.insert(pos, staged);
        // Recompute edges from scratch: whatever the cell referenced before
        // no longer applies.
        self.deps.replace_edges(pos, preds);
        self.update_occupancy(pos, was_occupied, now_occupied);
        self.invalidate_transitive(pos);

        Ok(())
    }

    /// Look up a cell. `None` for positions never touched by `set_cell`.
    pub fn cell(&self, pos: Position) -> Result<Option<CellView<'_>>, SheetError> {
        if !pos.in_bounds() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self
            .cells
            .get(&pos)
            .map(|cell| CellView { sheet: self, cell }))
    }

    /// Reset a cell to Empty in place. A no-op for never-touched positions.
    ///
    /// The cleared cell's reference edges are stripped from the graph, and
    /// its dependents are invalidated: they now read an empty cell.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.in_bounds() {
            return Err(SheetError::InvalidPosition(pos));
        }
        let Some(cell) = self.cells.get_mut(&pos) else {
            return Ok(());
        };

        let was_occupied = !cell.is_empty();
        cell.clear();
        self.deps.clear_cell(pos);
        self.update_occupancy(pos, was_occupied, false);
        self.invalidate_transitive(pos);

        Ok(())
    }

    /// The minimal rectangle, anchored at A1, containing every non-empty
    /// cell. (0, 0) when the sheet holds no content.
    pub fn printable_size(&self) -> Size {
        match (
            self.row_counts.last_key_value(),
            self.col_counts.last_key_value(),
        ) {
            (Some((&max_row, _)), Some((&max_col, _))) => Size {
                rows: max_row + 1,
                cols: max_col + 1,
            },
            _ => Size::default(),
        }
    }

    /// Emit cell values over the printable rectangle: tab-separated within a
    /// row, one line per row. Error values render as their fixed tokens.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, cell| cell.value(&SheetLookup { sheet }).to_string())
    }

    /// Emit cell texts over the printable rectangle, same shape as
    /// `print_values`.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |_, cell| cell.text())
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&Sheet, &Cell) -> String,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", render(self, cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Every position touched so far (including cleared ones), in no
    /// particular order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.keys().copied()
    }

    /// The cells `pos`'s formula reads.
    pub fn precedents(&self, pos: Position) -> Vec<Position> {
        self.deps.precedents(pos).collect()
    }

    /// The cells whose formulas read `pos`.
    pub fn dependents(&self, pos: Position) -> Vec<Position> {
        self.deps.dependents(pos).collect()
    }

    /// Invalidate the caches of `pos` and every transitive dependent.
    fn invalidate_transitive(&self, pos: Position) {
        for target in self.deps.transitive_dependents(pos) {
            if let Some(cell) = self.cells.get(&target) {
                cell.invalidate_cache();
            }
        }
    }

    fn update_occupancy(&mut self, pos: Position, was_occupied: bool, now_occupied: bool) {
        match (was_occupied, now_occupied) {
            (false, true) => {
                *self.row_counts.entry(pos.row).or_insert(0) += 1;
                *self.col_counts.entry(pos.col).or_insert(0) += 1;
            }
            (true, false) => {
                decrement_count(&mut self.row_counts, pos.row);
                decrement_count(&mut self.col_counts, pos.col);
            }
            _ => {}
        }
    }
}

fn decrement_count(counts: &mut BTreeMap<usize, usize>, key: usize) {
    if let Some(count) = counts.get_mut(&key) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&key);
        }
    }
}

/// Read access to one cell, resolving formula values through the sheet.
pub struct CellView<'a> {
    sheet: &'a Sheet,
    cell: &'a Cell,
}

impl CellView<'_> {
    pub fn kind(&self) -> CellKind {
        self.cell.kind()
    }

    /// The cell's computed value (cached for formulas until invalidated).
    pub fn value(&self) -> CellValue {
        self.cell.value(&SheetLookup { sheet: self.sheet })
    }

    /// The cell's raw text, with the formula re-rendered canonically.
    pub fn text(&self) -> String {
        self.cell.text()
    }

    /// Distinct positions the cell's formula reads.
    pub fn referenced_cells(&self) -> &[Position] {
        self.cell.referenced_cells()
    }

    /// True when the next read is served from cache.
    pub fn is_cached(&self) -> bool {
        self.cell.is_cached()
    }
}
