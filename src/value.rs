use std::fmt;

/// Error values produced while evaluating a formula. These are data, not failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormulaError {
    Ref,
    Value,
    Div0,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ref => "#REF!",
            Self::Value => "#VALUE!",
            Self::Div0 => "#DIV/0!",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl Default for Value {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Number(f)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Number(i as f64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Number(i as f64)
    }
}

impl From<FormulaError> for Value {
    fn from(e: FormulaError) -> Self {
        Self::Error(e)
    }
}

impl From<Result<f64, FormulaError>> for Value {
    fn from(res: Result<f64, FormulaError>) -> Self {
        match res {
            Ok(f) => Self::Number(f),
            Err(e) => Self::Error(e),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            // Shortest text that reads back as the same f64, never exponent
            // notation. This is not printf `%g`: no 6-digit rounding.
            Self::Number(n) => write!(f, "{n}"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<FormulaError> {
        match self {
            Self::Error(e) => Some(*e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_follows_value_kind() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(2).to_string(), "2");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(FormulaError::Div0).to_string(), "#DIV/0!");
        assert_eq!(Value::from(FormulaError::Ref).to_string(), "#REF!");
        assert_eq!(Value::from(FormulaError::Value).to_string(), "#VALUE!");
    }

    #[test]
    fn numbers_print_in_shortest_round_trip_form() {
        assert_eq!(Value::from(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::from(1.0 / 3.0).to_string(), "0.3333333333333333");
        assert_eq!(Value::from(1e21).to_string(), "1000000000000000000000");
        assert_eq!(Value::from(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn default_is_empty_text() {
        assert_eq!(Value::default(), Value::Text(String::new()));
    }

    #[test]
    fn accessors() {
        let n = Value::from(3_i64);
        assert!(n.is_number());
        assert_eq!(n.as_number(), Some(3.0));
        assert_eq!(n.as_text(), None);

        let e = Value::from(Err::<f64, _>(FormulaError::Value));
        assert!(e.is_error());
        assert_eq!(e.as_error(), Some(FormulaError::Value));
    }
}
