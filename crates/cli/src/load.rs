//! CSV ingest: load a delimited grid into the sheet anchored at A1.
//!
//! Fields go through the normal `set_cell` path, so a CSV field starting
//! with `=` becomes a live formula and a leading apostrophe escapes it.

use std::io::Read;

use anyhow::{Context, Result};

use tabula_engine::position::Position;
use tabula_engine::sheet::Sheet;

pub fn load_csv<R: Read>(sheet: &mut Sheet, reader: R, delimiter: u8) -> Result<()> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    for (row, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("csv row {}", row + 1))?;
        for (col, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            let pos = Position::new(row, col);
            sheet
                .set_cell(pos, field)
                .with_context(|| format!("cell {}", pos))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_engine::cell::CellValue;
    use tabula_engine::position::Size;

    fn value(sheet: &Sheet, label: &str) -> CellValue {
        sheet
            .cell(Position::parse(label).unwrap())
            .unwrap()
            .unwrap()
            .value()
    }

    #[test]
    fn test_load_plain_grid() {
        let mut sheet = Sheet::new();
        load_csv(&mut sheet, "a,b\nc,d\n".as_bytes(), b',').unwrap();

        assert_eq!(value(&sheet, "A1"), CellValue::Text("a".to_string()));
        assert_eq!(value(&sheet, "B2"), CellValue::Text("d".to_string()));
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });
    }

    #[test]
    fn test_formulas_in_fields_are_live() {
        let mut sheet = Sheet::new();
        load_csv(&mut sheet, "2,=A1*21\n".as_bytes(), b',').unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(42.0));
    }

    #[test]
    fn test_empty_fields_skipped() {
        let mut sheet = Sheet::new();
        load_csv(&mut sheet, "x,,y\n".as_bytes(), b',').unwrap();
        assert!(sheet
            .cell(Position::parse("B1").unwrap())
            .unwrap()
            .is_none());
        assert_eq!(sheet.printable_size(), Size { rows: 1, cols: 3 });
    }

    #[test]
    fn test_cycle_in_csv_is_reported_with_cell() {
        let mut sheet = Sheet::new();
        let err = load_csv(&mut sheet, "=B1,=A1\n".as_bytes(), b',').unwrap_err();
        assert!(format!("{:#}", err).contains("B1"));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let mut sheet = Sheet::new();
        load_csv(&mut sheet, "1;2\n".as_bytes(), b';').unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Text("2".to_string()));
    }
}
