//! Evaluation core of a spreadsheet.
//!
//! A [`Sheet`] owns its cells by [`Position`]. Text written to a cell is
//! classified as empty, plain text or a formula (leading `=`). Formulas may
//! refer to other cells; a write that would close a reference cycle is
//! rejected, and reads always reflect the current content of every cell a
//! formula depends on.
//!
//! ```
//! use cellgraph::{Position, Sheet, Value};
//!
//! let mut sheet = Sheet::new();
//! let a1: Position = "A1".parse().unwrap();
//! let b1: Position = "B1".parse().unwrap();
//!
//! sheet.set_cell(a1, "1").unwrap();
//! sheet.set_cell(b1, "=A1+1").unwrap();
//! assert_eq!(sheet.cell_value(b1).unwrap(), Value::Number(2.0));
//!
//! sheet.set_cell(a1, "5").unwrap();
//! assert_eq!(sheet.cell_value(b1).unwrap(), Value::Number(6.0));
//! ```

mod cell;
mod error;
mod formula;
mod position;
mod sheet;
mod value;

pub use crate::cell::{Cell, ESCAPE_SIGN, FORMULA_SIGN};
pub use crate::error::{Error, FormulaParseError, Result};
pub use crate::formula::{CellLookup, Formula, FormulaParser};
pub use crate::position::{InvalidPositionText, Position, Size};
pub use crate::sheet::Sheet;
pub use crate::value::{FormulaError, Value};
