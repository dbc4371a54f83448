//! Grid coordinates.
//!
//! A [`Position`] is a zero-based `(row, col)` pair. Textual form is the usual
//! spreadsheet notation: column letters followed by a one-based row number
//! (`A1` is `(0, 0)`, `AB12` is `(11, 27)`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const LETTERS: i32 = 26;
const MAX_POSITION_LENGTH: usize = 17;
const MAX_POS_LETTER_COUNT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const MAX_ROWS: i32 = 16384;
    pub const MAX_COLS: i32 = 16384;

    /// Sentinel lying outside the grid.
    pub const NONE: Position = Position { row: -1, col: -1 };

    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn is_valid(&self) -> bool {
        (0..Self::MAX_ROWS).contains(&self.row) && (0..Self::MAX_COLS).contains(&self.col)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

impl Size {
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid cell name: {0}")]
pub struct InvalidPositionText(pub String);

impl FromStr for Position {
    type Err = InvalidPositionText;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPositionText(s.to_string());
        if s.len() > MAX_POSITION_LENGTH {
            return Err(invalid());
        }

        let split = s
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || letters.len() > MAX_POS_LETTER_COUNT {
            return Err(invalid());
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = letters
            .bytes()
            .fold(0, |acc, b| acc * LETTERS + i32::from(b - b'A') + 1)
            - 1;
        let row = digits
            .parse::<i32>()
            .map_err(|_| invalid())?
            .checked_sub(1)
            .ok_or_else(invalid)?;

        let pos = Position::new(row, col);
        if pos.is_valid() {
            Ok(pos)
        } else {
            Err(invalid())
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return Ok(());
        }
        let mut letters = Vec::with_capacity(MAX_POS_LETTER_COUNT);
        let mut n = self.col + 1;
        while n > 0 {
            n -= 1;
            letters.push((b'A' + (n % LETTERS) as u8) as char);
            n /= LETTERS;
        }
        for c in letters.iter().rev() {
            write!(f, "{c}")?;
        }
        write!(f, "{}", self.row + 1)
    }
}
