//! Line-oriented mutation scripts.
//!
//! Each non-blank line is one operation:
//!
//! ```text
//! A1=2                 set A1 to the text "2"
//! B1==A1*10            set B1 to the formula =A1*10
//! clear A1             reset A1 to empty
//! # comment            skipped, as are blank lines
//! ```
//!
//! Everything after the first `=` is passed to the engine verbatim, so a
//! second `=` starts a formula and a lone trailing `=` sets an empty cell.

use anyhow::{anyhow, bail, Context, Result};

use tabula_engine::position::Position;
use tabula_engine::sheet::Sheet;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Set { pos: Position, text: String },
    Clear { pos: Position },
}

/// Parse a single script line. `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<Op>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = trimmed.strip_prefix("clear ") {
        let label = rest.trim();
        let pos =
            Position::parse(label).ok_or_else(|| anyhow!("bad cell label: {:?}", label))?;
        return Ok(Some(Op::Clear { pos }));
    }

    let Some((label, text)) = trimmed.split_once('=') else {
        bail!("expected LABEL=TEXT or 'clear LABEL', got {:?}", trimmed);
    };
    let label = label.trim();
    let pos = Position::parse(label).ok_or_else(|| anyhow!("bad cell label: {:?}", label))?;
    Ok(Some(Op::Set {
        pos,
        text: text.to_string(),
    }))
}

/// Apply a whole script to the sheet, failing fast with the line number on
/// the first bad line or rejected mutation.
pub fn run_script(sheet: &mut Sheet, source: &str, verbose: bool) -> Result<()> {
    for (idx, line) in source.lines().enumerate() {
        let Some(op) = parse_line(line).with_context(|| format!("script line {}", idx + 1))?
        else {
            continue;
        };

        match &op {
            Op::Set { pos, text } => sheet.set_cell(*pos, text),
            Op::Clear { pos } => sheet.clear_cell(*pos),
        }
        .with_context(|| format!("script line {}", idx + 1))?;

        if verbose {
            match &op {
                Op::Set { pos, .. } => eprintln!(
                    "[script] set {}  dependents={}",
                    pos,
                    sheet.dependents(*pos).len()
                ),
                Op::Clear { pos } => eprintln!("[script] clear {}", pos),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_engine::cell::CellValue;

    fn pos(label: &str) -> Position {
        Position::parse(label).unwrap()
    }

    #[test]
    fn test_parse_set_line() {
        assert_eq!(
            parse_line("A1=hello").unwrap(),
            Some(Op::Set {
                pos: pos("A1"),
                text: "hello".to_string()
            })
        );
        // A second '=' starts a formula body.
        assert_eq!(
            parse_line("B2==A1+1").unwrap(),
            Some(Op::Set {
                pos: pos("B2"),
                text: "=A1+1".to_string()
            })
        );
        // Trailing '=' alone sets an empty cell.
        assert_eq!(
            parse_line("C3=").unwrap(),
            Some(Op::Set {
                pos: pos("C3"),
                text: String::new()
            })
        );
    }

    #[test]
    fn test_parse_clear_and_skips() {
        assert_eq!(
            parse_line("clear B7").unwrap(),
            Some(Op::Clear { pos: pos("B7") })
        );
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# comment").unwrap(), None);
    }

    #[test]
    fn test_parse_bad_lines() {
        assert!(parse_line("no equals sign").is_err());
        assert!(parse_line("1A=5").is_err());
        assert!(parse_line("clear nope").is_err());
    }

    #[test]
    fn test_run_script_builds_sheet() {
        let mut sheet = Sheet::new();
        run_script(
            &mut sheet,
            "# totals\nA1=2\nB1==A1*10\nA2=ignored\nclear A2\n",
            false,
        )
        .unwrap();

        let b1 = sheet.cell(pos("B1")).unwrap().unwrap();
        assert_eq!(b1.value(), CellValue::Number(20.0));
        assert!(sheet.cell(pos("A2")).unwrap().unwrap().text().is_empty());
    }

    #[test]
    fn test_run_script_reports_line_numbers() {
        let mut sheet = Sheet::new();
        let err = run_script(&mut sheet, "A1=1\nB1==A1+\n", false).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_run_script_stops_on_cycle() {
        let mut sheet = Sheet::new();
        let err = run_script(&mut sheet, "A1==B1\nB1==A1\n", false).unwrap_err();
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("line 2"));
        assert!(rendered.contains("circular"));
    }
}
