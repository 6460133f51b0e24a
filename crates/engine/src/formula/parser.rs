// Formula parser - converts formula body text (after the leading marker) into an AST
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), unary +/-, parentheses

use crate::position::{self, Position};

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    CellRef(Position),
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(&self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnOp {
    Plus,
    Minus,
}

impl UnOp {
    fn symbol(&self) -> char {
        match self {
            UnOp::Plus => '+',
            UnOp::Minus => '-',
        }
    }
}

impl Expr {
    /// Binding strength, used by `render` to decide where parentheses are
    /// required: atoms 4, unary 3, mul/div 2, add/sub 1.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::CellRef(_) => 4,
            Expr::UnaryOp { .. } => 3,
            Expr::BinaryOp { op: Op::Mul | Op::Div, .. } => 2,
            Expr::BinaryOp { op: Op::Add | Op::Sub, .. } => 1,
        }
    }

    /// Render the canonical text of the expression with minimal parentheses.
    ///
    /// A right operand keeps its parentheses when it binds no tighter than a
    /// subtraction or division above it: `1-(2-3)` must not collapse to
    /// `1-2-3`.
    pub fn render(&self) -> String {
        match self {
            Expr::Number(n) => format!("{}", n),
            Expr::CellRef(pos) => {
                // Out-of-bounds references render as written; they evaluate
                // to #REF!, but the text must round-trip.
                format!("{}{}", position::col_to_letters(pos.col), pos.row + 1)
            }
            Expr::UnaryOp { op, operand } => {
                let inner = operand.render();
                if operand.precedence() < self.precedence() {
                    format!("{}({})", op.symbol(), inner)
                } else {
                    format!("{}{}", op.symbol(), inner)
                }
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = self.precedence();
                let left_text = if left.precedence() < prec {
                    format!("({})", left.render())
                } else {
                    left.render()
                };
                let needs_right_parens = right.precedence() < prec
                    || (right.precedence() == prec && matches!(op, Op::Sub | Op::Div));
                let right_text = if needs_right_parens {
                    format!("({})", right.render())
                } else {
                    right.render()
                };
                format!("{}{}{}", left_text, op.symbol(), right_text)
            }
        }
    }
}

/// Parse a formula body into an AST.
///
/// The input excludes the leading marker character; classification of cell
/// text happens in the cell model, not here.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err("unexpected trailing tokens".to_string());
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            'A'..='Z' => {
                let mut letters = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_uppercase() {
                        letters.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let mut digits = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() {
                        digits.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    return Err(format!("invalid cell reference: {}", letters));
                }
                tokens.push(Token::CellRef(raw_cell_ref(&letters, &digits)?));
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Convert a letters+digits reference into raw coordinates.
///
/// Coordinates beyond the grid bounds are kept (saturating on overflow);
/// evaluation reports them as #REF!. A zero row ("A0") is a parse error.
fn raw_cell_ref(letters: &str, digits: &str) -> Result<Position, String> {
    let col = letters.bytes().fold(0usize, |acc, b| {
        acc.saturating_mul(26).saturating_add((b - b'A' + 1) as usize)
    });
    let row: usize = digits.parse().unwrap_or(usize::MAX);
    if row == 0 {
        return Err(format!("invalid cell reference: {}{}", letters, digits));
    }
    Ok(Position::new(row - 1, col - 1))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let op = match tokens.get(pos) {
        Some(Token::Plus) => UnOp::Plus,
        Some(Token::Minus) => UnOp::Minus,
        _ => return parse_primary(tokens, pos),
    };
    let (operand, new_pos) = parse_unary(tokens, pos + 1)?;
    Ok((
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        },
        new_pos,
    ))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    match tokens.get(pos) {
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::CellRef(p)) => Ok((Expr::CellRef(*p), pos + 1)),
        Some(Token::LParen) => {
            let (expr, after) = parse_add_sub(tokens, pos + 1)?;
            match tokens.get(after) {
                Some(Token::RParen) => Ok((expr, after + 1)),
                _ => Err("expected closing parenthesis".to_string()),
            }
        }
        Some(other) => Err(format!("unexpected token: {:?}", other)),
        None => Err("unexpected end of formula".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(input: &str) -> String {
        parse(input).unwrap().render()
    }

    #[test]
    fn test_parse_number() {
        assert!(matches!(parse("42").unwrap(), Expr::Number(n) if n == 42.0));
        assert!(matches!(parse("3.5").unwrap(), Expr::Number(n) if n == 3.5));
    }

    #[test]
    fn test_parse_cell_ref() {
        match parse("B7").unwrap() {
            Expr::CellRef(pos) => assert_eq!(pos, Position::new(6, 1)),
            other => panic!("expected cell ref, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_out_of_bounds_ref_is_kept() {
        // ZZZ is column 18277, beyond the grid; the parser keeps it and
        // evaluation turns it into #REF!.
        match parse("ZZZ1").unwrap() {
            Expr::CellRef(pos) => {
                assert!(!pos.in_bounds());
                assert_eq!(pos.col, 18_277);
            }
            other => panic!("expected cell ref, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("1+").is_err());
        assert!(parse("(1+2").is_err());
        assert!(parse("1+2)").is_err());
        assert!(parse("A").is_err());
        assert!(parse("A0").is_err());
        assert!(parse("a1").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("1?2").is_err());
        assert!(parse("1..2").is_err());
    }

    #[test]
    fn test_precedence() {
        assert_eq!(render("1+2*3"), "1+2*3");
        assert_eq!(render("(1+2)*3"), "(1+2)*3");
        assert_eq!(render("1*2+3"), "1*2+3");
        // Redundant parentheses are dropped.
        assert_eq!(render("(1)+(2)"), "1+2");
        assert_eq!(render("1+(2*3)"), "1+2*3");
    }

    #[test]
    fn test_right_operand_parens_preserved() {
        assert_eq!(render("1-(2-3)"), "1-(2-3)");
        assert_eq!(render("1-(2+3)"), "1-(2+3)");
        assert_eq!(render("8/(4/2)"), "8/(4/2)");
        assert_eq!(render("2*(3+4)"), "2*(3+4)");
        // Left-associative chains need no parentheses.
        assert_eq!(render("1-2+3"), "1-2+3");
        assert_eq!(render("8/4/2"), "8/4/2");
    }

    #[test]
    fn test_unary() {
        assert_eq!(render("-1"), "-1");
        assert_eq!(render("+A1"), "+A1");
        assert_eq!(render("--1"), "--1");
        assert_eq!(render("-(1+2)"), "-(1+2)");
        assert_eq!(render("-(2*3)"), "-(2*3)");
        assert_eq!(render("1+-2"), "1+-2");
    }

    #[test]
    fn test_render_round_trip() {
        for src in ["1+2*3", "(1+2)*3", "1-(2-3)", "-(A1+B2)/C3", "A1+A1+B2"] {
            let once = render(src);
            assert_eq!(render(&once), once, "render not canonical for {:?}", src);
        }
    }

    #[test]
    fn test_whitespace_ignored() {
        assert_eq!(render(" 1 +\t2 "), "1+2");
    }
}
