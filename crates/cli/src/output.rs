//! Sheet output: JSON cell dumps for `--format json`.

use serde::Serialize;

use tabula_engine::cell::{CellKind, CellValue};
use tabula_engine::position::{Position, Size};
use tabula_engine::sheet::Sheet;

#[derive(Serialize)]
pub struct CellRecord {
    pub pos: Position,
    pub a1: String,
    pub text: String,
    pub value: CellValue,
}

#[derive(Serialize)]
pub struct SheetDump {
    pub size: Size,
    pub cells: Vec<CellRecord>,
}

/// Snapshot every non-empty cell, sorted by (row, col).
pub fn dump(sheet: &Sheet) -> SheetDump {
    let mut positions: Vec<Position> = sheet.positions().collect();
    positions.sort();

    let cells = positions
        .into_iter()
        .filter_map(|pos| {
            let view = sheet.cell(pos).ok().flatten()?;
            if view.kind() == CellKind::Empty {
                return None;
            }
            Some(CellRecord {
                pos,
                a1: pos.to_a1(),
                text: view.text(),
                value: view.value(),
            })
        })
        .collect();

    SheetDump {
        size: sheet.printable_size(),
        cells,
    }
}
