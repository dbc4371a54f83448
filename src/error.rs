use crate::formula::Ast;
use crate::position::Position;
use santiago::lexer::LexerError;
use santiago::parser::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid position passed to {0}")]
    InvalidPosition(&'static str),

    #[error("Circular dependency detected at {0}")]
    CircularDependency(Position),

    #[error("Unable to parse formula: {0}")]
    FormulaParse(#[from] FormulaParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons formula text is rejected.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum FormulaParseError {
    #[error("{0}")]
    Lexer(String),

    #[error("{0}")]
    Parser(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

impl From<LexerError> for FormulaParseError {
    fn from(err: LexerError) -> Self {
        Self::Lexer(err.to_string())
    }
}

impl From<ParseError<Ast>> for FormulaParseError {
    fn from(err: ParseError<Ast>) -> Self {
        Self::Parser(err.to_string())
    }
}
