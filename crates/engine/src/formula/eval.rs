// Formula evaluator - walks the AST against a cell lookup capability

use crate::cell::CellValue;
use crate::error::FormulaError;
use crate::position::Position;

use super::parser::{Expr, Op, UnOp};

/// Read-only access to current cell values, supplied by the sheet at
/// evaluation time.
///
/// Evaluation is a same-thread, read-only recursion: an implementation must
/// not mutate cell contents while a formula is being evaluated.
pub trait CellLookup {
    /// Current value of the cell at `pos`. Untouched cells read as empty text.
    fn cell_value(&self, pos: Position) -> CellValue;
}

/// Evaluate an expression to a number or a typed error.
///
/// Errors are values here, not failures: referencing an error cell yields
/// that error, text that is not a number yields #VALUE!, an out-of-bounds
/// reference yields #REF!, and non-finite arithmetic yields #DIV/0!.
pub fn evaluate(expr: &Expr, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(pos) => resolve_ref(*pos, lookup),
        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand, lookup)?;
            Ok(match op {
                UnOp::Plus => value,
                UnOp::Minus => -value,
            })
        }
        Expr::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, lookup)?;
            let rhs = evaluate(right, lookup)?;
            let result = match op {
                Op::Add => lhs + rhs,
                Op::Sub => lhs - rhs,
                Op::Mul => lhs * rhs,
                Op::Div => lhs / rhs,
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(FormulaError::Div0)
            }
        }
    }
}

/// Numeric coercion for a referenced cell.
fn resolve_ref(pos: Position, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
    if !pos.in_bounds() {
        return Err(FormulaError::Ref);
    }
    match lookup.cell_value(pos) {
        CellValue::Number(n) => Ok(n),
        CellValue::Text(s) if s.is_empty() => Ok(0.0),
        CellValue::Text(s) => s.parse::<f64>().map_err(|_| FormulaError::Value),
        CellValue::Error(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use std::collections::HashMap;

    /// Fixed lookup over a map; everything else reads as empty text.
    struct MapLookup(HashMap<Position, CellValue>);

    impl CellLookup for MapLookup {
        fn cell_value(&self, pos: Position) -> CellValue {
            self.0
                .get(&pos)
                .cloned()
                .unwrap_or_else(|| CellValue::Text(String::new()))
        }
    }

    fn empty_lookup() -> MapLookup {
        MapLookup(HashMap::new())
    }

    fn eval(src: &str, lookup: &MapLookup) -> Result<f64, FormulaError> {
        evaluate(&parse(src).unwrap(), lookup)
    }

    #[test]
    fn test_arithmetic() {
        let lookup = empty_lookup();
        assert_eq!(eval("1+2*3", &lookup), Ok(7.0));
        assert_eq!(eval("(1+2)*3", &lookup), Ok(9.0));
        assert_eq!(eval("10-4/2", &lookup), Ok(8.0));
        assert_eq!(eval("-3*-2", &lookup), Ok(6.0));
        assert_eq!(eval("+5", &lookup), Ok(5.0));
    }

    #[test]
    fn test_division_by_zero() {
        let lookup = empty_lookup();
        assert_eq!(eval("1/0", &lookup), Err(FormulaError::Div0));
        assert_eq!(eval("0/0", &lookup), Err(FormulaError::Div0));
        assert_eq!(eval("1/(2-2)", &lookup), Err(FormulaError::Div0));
    }

    #[test]
    fn test_cell_coercion() {
        let a1 = Position::new(0, 0);
        let b1 = Position::new(0, 1);
        let c1 = Position::new(0, 2);
        let lookup = MapLookup(HashMap::from([
            (a1, CellValue::Number(4.0)),
            (b1, CellValue::Text("2.5".to_string())),
            (c1, CellValue::Text("soon".to_string())),
        ]));

        assert_eq!(eval("A1*2", &lookup), Ok(8.0));
        // Numeric text coerces.
        assert_eq!(eval("B1+1", &lookup), Ok(3.5));
        // Non-numeric text does not.
        assert_eq!(eval("C1+1", &lookup), Err(FormulaError::Value));
        // Untouched cells read as zero.
        assert_eq!(eval("D9+1", &lookup), Ok(1.0));
    }

    #[test]
    fn test_error_propagation() {
        let a1 = Position::new(0, 0);
        let lookup = MapLookup(HashMap::from([(a1, CellValue::Error(FormulaError::Div0))]));
        assert_eq!(eval("A1+1", &lookup), Err(FormulaError::Div0));
        assert_eq!(eval("-A1", &lookup), Err(FormulaError::Div0));
    }

    #[test]
    fn test_out_of_bounds_ref() {
        let lookup = empty_lookup();
        assert_eq!(eval("ZZZ1", &lookup), Err(FormulaError::Ref));
        assert_eq!(eval("A999999999999", &lookup), Err(FormulaError::Ref));
    }
}
