//! Arithmetic formulas over cell references.
//!
//! Formula text (without the leading `=`) is lexed and parsed with santiago into
//! a loose syntax tree, then lowered into [`Formula`], which knows the cells it
//! reads, how to evaluate itself against a [`CellLookup`] and how to print
//! itself back in canonical form.

use std::fmt;

use santiago::grammar::Grammar;
use santiago::lexer::LexerRules;

use crate::error::FormulaParseError;
use crate::position::Position;
use crate::value::{FormulaError, Value};

/// Read-only view of cell values handed to a formula while it evaluates.
pub trait CellLookup {
    /// The value stored at `pos`, or `None` when nothing is stored there.
    fn value_at(&self, pos: Position) -> Option<Value>;
}

#[derive(Debug)]
pub enum Ast {
    Cell(String),
    Number(String),
    BinaryOperation(Vec<Ast>),
    OperatorAdd,
    OperatorSubtract,
    OperatorMultiply,
    OperatorDivide,
    UnaryOperation(Vec<Ast>),
    Parentheses(Vec<Ast>),
    LeftParenthesis,
    RightParenthesis,
}

pub struct FormulaParser {
    lexer: LexerRules,
    grammar: Grammar<Ast>,
}

impl Default for FormulaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaParser {
    pub fn new() -> Self {
        Self {
            lexer: santiago::lexer_rules!(
                "DEFAULT" | "CELL" = pattern r"[A-Z]+[0-9]+";
                "DEFAULT" | "FLOAT" = pattern r"[0-9]+\.[0-9]*";
                "DEFAULT" | "INT" = pattern r"[0-9]+";
                "DEFAULT" | "+" = string "+";
                "DEFAULT" | "-" = string "-";
                "DEFAULT" | "*" = string "*";
                "DEFAULT" | "/" = string "/";
                "DEFAULT" | "(" = string "(";
                "DEFAULT" | ")" = string ")";
                "DEFAULT" | "WS" = pattern r"\s" => |lexer| lexer.skip();
            ),
            grammar: santiago::grammar!(
                "expr" => rules "expr" "add" "term" =>
                    Ast::BinaryOperation;
                "expr" => rules "expr" "subtract" "term" =>
                    Ast::BinaryOperation;
                "expr" => rules "term";

                "term" => rules "term" "multiply" "factor" =>
                    Ast::BinaryOperation;
                "term" => rules "term" "divide" "factor" =>
                    Ast::BinaryOperation;
                "term" => rules "factor";

                "factor" => rules "add" "factor" =>
                    Ast::UnaryOperation;
                "factor" => rules "subtract" "factor" =>
                    Ast::UnaryOperation;
                "factor" => rules "cell";
                "factor" => rules "float";
                "factor" => rules "int";
                "factor" => rules "leftp" "expr" "rightp" => Ast::Parentheses;

                "add" => lexemes "+" =>
                    |_| Ast::OperatorAdd;
                "subtract" => lexemes "-" =>
                    |_| Ast::OperatorSubtract;
                "multiply" => lexemes "*" =>
                    |_| Ast::OperatorMultiply;
                "divide" => lexemes "/" =>
                    |_| Ast::OperatorDivide;

                "cell" => lexemes "CELL" =>
                    |lexemes| Ast::Cell(lexemes[0].raw.clone());
                "float" => lexemes "FLOAT" =>
                    |lexemes| Ast::Number(lexemes[0].raw.clone());
                "int" => lexemes "INT" =>
                    |lexemes| Ast::Number(lexemes[0].raw.clone());
                "leftp" => lexemes "(" =>
                    |_| Ast::LeftParenthesis;
                "rightp" => lexemes ")" =>
                    |_| Ast::RightParenthesis;
            ),
        }
    }

    /// Parses formula text, i.e. everything after the leading `=`.
    pub fn parse(&self, text: &str) -> Result<Formula, FormulaParseError> {
        let lexemes = santiago::lexer::lex(&self.lexer, text)?;
        let trees = santiago::parser::parse(&self.grammar, &lexemes)?;
        let tree = match trees.as_slice() {
            [tree] => tree,
            _ => return Err(FormulaParseError::InvalidExpression(text.to_string())),
        };
        let expr = Expr::lower(tree.as_abstract_syntax_tree())?;
        Ok(Formula::new(expr))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Number(f64),
    Cell(Position),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

fn malformed(what: &str) -> FormulaParseError {
    FormulaParseError::Parser(format!("malformed {what} node"))
}

impl Expr {
    fn lower(ast: Ast) -> Result<Expr, FormulaParseError> {
        match ast {
            Ast::Number(raw) => raw
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| FormulaParseError::InvalidNumber(raw)),
            Ast::Cell(raw) => raw
                .parse::<Position>()
                .map(Expr::Cell)
                .map_err(|_| FormulaParseError::InvalidReference(raw)),
            Ast::Parentheses(args) => {
                let [_, inner, _]: [Ast; 3] =
                    args.try_into().map_err(|_| malformed("parentheses"))?;
                Expr::lower(inner)
            }
            Ast::UnaryOperation(args) => {
                let [op, operand]: [Ast; 2] =
                    args.try_into().map_err(|_| malformed("unary"))?;
                let op = match op {
                    Ast::OperatorAdd => UnaryOp::Plus,
                    Ast::OperatorSubtract => UnaryOp::Minus,
                    _ => return Err(malformed("unary operator")),
                };
                Ok(Expr::Unary(op, Box::new(Expr::lower(operand)?)))
            }
            Ast::BinaryOperation(args) => {
                let [lhs, op, rhs]: [Ast; 3] =
                    args.try_into().map_err(|_| malformed("binary"))?;
                let op = match op {
                    Ast::OperatorAdd => BinaryOp::Add,
                    Ast::OperatorSubtract => BinaryOp::Sub,
                    Ast::OperatorMultiply => BinaryOp::Mul,
                    Ast::OperatorDivide => BinaryOp::Div,
                    _ => return Err(malformed("binary operator")),
                };
                Ok(Expr::Binary(
                    op,
                    Box::new(Expr::lower(lhs)?),
                    Box::new(Expr::lower(rhs)?),
                ))
            }
            _ => Err(malformed("expression")),
        }
    }

    /// Binding strength, mirroring the `expr`/`term`/`factor` layers of the grammar.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(BinaryOp::Add | BinaryOp::Sub, ..) => 1,
            Expr::Binary(BinaryOp::Mul | BinaryOp::Div, ..) => 2,
            Expr::Unary(..) => 3,
            Expr::Number(_) | Expr::Cell(_) => 4,
        }
    }

    fn collect_cells(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Cell(pos) => out.push(*pos),
            Expr::Unary(_, operand) => operand.collect_cells(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_cells(out);
                rhs.collect_cells(out);
            }
        }
    }

    fn eval(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Cell(pos) => cell_number(lookup.value_at(*pos)),
            Expr::Unary(op, operand) => {
                let v = operand.eval(lookup)?;
                Ok(match op {
                    UnaryOp::Plus => v,
                    UnaryOp::Minus => -v,
                })
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(lookup)?;
                let r = rhs.eval(lookup)?;
                let res = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                };
                finite(res)
            }
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Cell(pos) => write!(f, "{pos}"),
            Expr::Unary(op, operand) => {
                f.write_str(match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                })?;
                operand.write_operand(f, operand.precedence() < self.precedence())
            }
            Expr::Binary(op, lhs, rhs) => {
                let own = self.precedence();
                lhs.write_operand(f, lhs.precedence() < own)?;
                f.write_str(match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                })?;
                // `a-(b-c)` and `a/(b*c)` must keep their parentheses.
                let non_assoc = matches!(op, BinaryOp::Sub | BinaryOp::Div);
                let rhs_parens =
                    rhs.precedence() < own || (non_assoc && rhs.precedence() == own);
                rhs.write_operand(f, rhs_parens)
            }
        }
    }
}

fn finite(n: f64) -> Result<f64, FormulaError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(FormulaError::Div0)
    }
}

/// Coerces a referenced cell's value into a number.
fn cell_number(value: Option<Value>) -> Result<f64, FormulaError> {
    match value {
        None => Ok(0.0),
        Some(Value::Number(n)) => Ok(n),
        Some(Value::Error(e)) => Err(e),
        Some(Value::Text(s)) if s.is_empty() => Ok(0.0),
        Some(Value::Text(s)) => s
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(FormulaError::Value),
    }
}

/// A parsed formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    expr: Expr,
    references: Vec<Position>,
}

impl Formula {
    fn new(expr: Expr) -> Self {
        let mut references = Vec::new();
        expr.collect_cells(&mut references);
        references.sort();
        references.dedup();
        Self { expr, references }
    }

    pub fn evaluate(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        self.expr.eval(lookup).and_then(finite)
    }

    /// Canonical text of the expression, without the leading `=`.
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Cells read by this formula, sorted and without duplicates.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct Cells(HashMap<Position, Value>);

    impl CellLookup for Cells {
        fn value_at(&self, pos: Position) -> Option<Value> {
            self.0.get(&pos).cloned()
        }
    }

    fn cells(entries: &[(&str, Value)]) -> Cells {
        Cells(
            entries
                .iter()
                .map(|(name, v)| (name.parse().unwrap(), v.clone()))
                .collect(),
        )
    }

    fn eval(text: &str) -> Result<f64, FormulaError> {
        FormulaParser::new()
            .parse(text)
            .unwrap()
            .evaluate(&cells(&[]))
    }

    fn canonical(text: &str) -> String {
        FormulaParser::new().parse(text).unwrap().expression()
    }

    #[test]
    fn arithmetic_works() {
        assert_eq!(eval("1"), Ok(1.0));
        assert_eq!(eval("1 + 2"), Ok(3.0));
        assert_eq!(eval("1+2*3"), Ok(7.0));
        assert_eq!(eval("(1+2)*3"), Ok(9.0));
        assert_eq!(eval("10-4-3"), Ok(3.0));
        assert_eq!(eval("8/4/2"), Ok(1.0));
        assert_eq!(eval("2.5*2"), Ok(5.0));
        assert_eq!(eval("3/2"), Ok(1.5));
    }

    #[test]
    fn unary_ops_work() {
        assert_eq!(eval("+2"), Ok(2.0));
        assert_eq!(eval("-2"), Ok(-2.0));
        assert_eq!(eval("-(2 + 2)"), Ok(-4.0));
        assert_eq!(eval("-2 + 2"), Ok(0.0));
        assert_eq!(eval("-2 * 3"), Ok(-6.0));
    }

    #[test]
    fn unary_after_operator_is_accepted() {
        assert_eq!(eval("2*-3"), Ok(-6.0));
        assert_eq!(eval("2/-1"), Ok(-2.0));
        assert_eq!(eval("1--2"), Ok(3.0));
        assert_eq!(eval("1+-2"), Ok(-1.0));
        assert_eq!(eval("--2"), Ok(2.0));
        assert_eq!(eval("+-2"), Ok(-2.0));
    }

    #[test]
    fn division_by_zero_is_an_error_value() {
        assert_eq!(eval("1/0"), Err(FormulaError::Div0));
        assert_eq!(eval("0/0"), Err(FormulaError::Div0));
    }

    #[test]
    fn references_are_sorted_and_unique() {
        let formula = FormulaParser::new().parse("B2 + A1 * B2 + A3").unwrap();
        assert_eq!(
            formula.referenced_cells(),
            &[
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(2, 0)
            ]
        );
    }

    #[test]
    fn reference_values_are_coerced() {
        let lookup = cells(&[
            ("A1", Value::from(2)),
            ("A2", Value::from("3")),
            ("A3", Value::from("")),
            ("A4", Value::from("abc")),
            ("A5", Value::from(FormulaError::Div0)),
        ]);
        let parser = FormulaParser::new();
        let eval = |text: &str| parser.parse(text).unwrap().evaluate(&lookup);

        assert_eq!(eval("A1+A2"), Ok(5.0));
        assert_eq!(eval("A1+A3"), Ok(2.0));
        assert_eq!(eval("A1+Z99"), Ok(2.0));
        assert_eq!(eval("A1+A4"), Err(FormulaError::Value));
        assert_eq!(eval("A4+A5"), Err(FormulaError::Value));
        assert_eq!(eval("A5+A4"), Err(FormulaError::Div0));
    }

    #[test]
    fn canonical_text_drops_redundant_parentheses() {
        assert_eq!(canonical("1 + 2"), "1+2");
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("1+(2*3)"), "1+2*3");
        assert_eq!(canonical("((A1))"), "A1");
        assert_eq!(canonical("1-(2-3)"), "1-(2-3)");
        assert_eq!(canonical("1-(2+3)"), "1-(2+3)");
        assert_eq!(canonical("(1-2)-3"), "1-2-3");
        assert_eq!(canonical("1/(2*3)"), "1/(2*3)");
        assert_eq!(canonical("1+(2-3)"), "1+2-3");
        assert_eq!(canonical("-(A1+1)"), "-(A1+1)");
        assert_eq!(canonical("2.50*B3"), "2.5*B3");
        assert_eq!(canonical("1/0"), "1/0");
        assert_eq!(canonical("-(-2)"), "--2");
        assert_eq!(canonical("1-(-2)"), "1--2");
        assert_eq!(canonical("2*(-3)"), "2*-3");
        assert_eq!(canonical("(-A1)*2"), "-A1*2");
        assert_eq!(canonical("-(A1*2)"), "-(A1*2)");
    }

    #[test]
    fn canonical_text_parses_back_to_the_same_formula() {
        let parser = FormulaParser::new();
        for text in [
            "1 + 2",
            "(1+2)*3",
            "1+(2*3)",
            "((A1))",
            "1-(2-3)",
            "(1-2)-3",
            "1/(2*3)",
            "(1/2)/3",
            "-(A1+1)",
            "-(-2)",
            "1-(-2)",
            "2*(-3)",
            "(-A1)*2",
            "-(A1*2)",
            "+(-(B2))",
            "((1+2))*(3-(4-5))",
            "2.50*B3/-(C4-1)",
        ] {
            let formula = parser.parse(text).unwrap();
            let printed = formula.expression();
            let reparsed = parser.parse(&printed).unwrap();
            assert_eq!(reparsed, formula, "{text} printed as {printed}");
            assert_eq!(reparsed.expression(), printed);
        }
    }

    #[test]
    fn syntax_errors() {
        let parser = FormulaParser::new();
        assert!(matches!(
            parser.parse("3//2"),
            Err(FormulaParseError::Parser(_))
        ));
        assert!(matches!(
            parser.parse("(A2+1))"),
            Err(FormulaParseError::Parser(_))
        ));
        assert!(matches!(
            parser.parse("1 + a1"),
            Err(FormulaParseError::Lexer(_))
        ));
    }

    #[test]
    fn out_of_grid_references_are_rejected() {
        let parser = FormulaParser::new();
        assert_eq!(
            parser.parse("A123456 + 1"),
            Err(FormulaParseError::InvalidReference("A123456".to_string()))
        );
        assert_eq!(
            parser.parse("ZZZZ1"),
            Err(FormulaParseError::InvalidReference("ZZZZ1".to_string()))
        );
    }
}
