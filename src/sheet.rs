use std::collections::{HashMap, HashSet};
use std::io::Write;

use log::debug;

use crate::cell::{Cell, Revision};
use crate::error::Error::{CircularDependency, InvalidPosition};
use crate::error::Result;
use crate::formula::{CellLookup, FormulaParser};
use crate::position::{Position, Size};
use crate::value::{FormulaError, Value};

/// Owns every cell, keyed by position.
///
/// Cells refer to each other only by [`Position`]; the sheet resolves those
/// keys. Writes are rejected when they would close a dependency cycle, so
/// evaluation always terminates.
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    parser: FormulaParser,
    revision: Revision,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            parser: FormulaParser::new(),
            revision: Revision::default(),
        }
    }

    pub(crate) fn parser(&self) -> &FormulaParser {
        &self.parser
    }

    pub(crate) fn revision(&self) -> Revision {
        self.revision.clone()
    }

    fn check_position(pos: Position, operation: &'static str) -> Result<()> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(InvalidPosition(operation))
        }
    }

    /// Stores `text` at `pos`.
    ///
    /// Cells referenced by a new formula are created empty first. They stay
    /// in the sheet even when the write itself is then rejected as circular;
    /// only the slot at `pos` is guaranteed untouched on failure.
    ///
    /// That includes `pos` itself: if `pos` is absent and the formula refers
    /// to it (`A3 = "=1+A3"`), the write fails with
    /// [`CircularDependency`](crate::Error::CircularDependency) but `pos` is
    /// left holding an empty cell.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        Self::check_position(pos, "set_cell")?;

        let mut candidate = Cell::new(self);
        candidate.set(text, self)?;

        if self.has_circular_dependency(&candidate, pos) {
            debug!("rejecting {text:?} at {pos}: circular dependency");
            return Err(CircularDependency(pos));
        }

        debug!("set {pos} = {text:?}");
        self.cells.insert(pos, candidate);
        self.revision.bump();
        Ok(())
    }

    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        Self::check_position(pos, "get_cell")?;
        Ok(self.cells.get(&pos))
    }

    pub fn get_cell_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>> {
        Self::check_position(pos, "get_cell_mut")?;
        Ok(self.cells.get_mut(&pos))
    }

    /// Removes the cell at `pos`. Formulas referring to it now read it as empty.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        Self::check_position(pos, "clear_cell")?;
        if self.cells.remove(&pos).is_some() {
            debug!("cleared {pos}");
            self.revision.bump();
        }
        Ok(())
    }

    /// Value at `pos`, reading absent cells as empty text.
    pub fn cell_value(&self, pos: Position) -> Result<Value> {
        Ok(self
            .get_cell(pos)?
            .map(|cell| cell.value(self))
            .unwrap_or_default())
    }

    /// Rows and columns spanned from `A1` to the furthest stored cell.
    pub fn printable_size(&self) -> Size {
        self.cells.keys().fold(Size::default(), |size, pos| {
            Size::new(size.rows.max(pos.row + 1), size.cols.max(pos.col + 1))
        })
    }

    pub fn print_values<W: Write>(&self, output: &mut W) -> Result<()> {
        self.print_cells(output, |cell| cell.value(self).to_string())
    }

    pub fn print_texts<W: Write>(&self, output: &mut W) -> Result<()> {
        self.print_cells(output, Cell::text)
    }

    fn print_cells<W, F>(&self, output: &mut W, field: F) -> Result<()>
    where
        W: Write,
        F: Fn(&Cell) -> String,
    {
        let Size { rows, cols } = self.printable_size();
        for row in 0..rows {
            for col in 0..cols {
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    output.write_all(field(cell).as_bytes())?;
                }
                if col + 1 < cols {
                    output.write_all(b"\t")?;
                }
            }
            output.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Whether anything reachable from `candidate` refers back to `head`.
    fn has_circular_dependency(&self, candidate: &Cell, head: Position) -> bool {
        let mut visited = HashSet::new();
        let mut pending = candidate.referenced_cells().to_vec();
        while let Some(pos) = pending.pop() {
            if pos == head {
                return true;
            }
            if !visited.insert(pos) {
                continue;
            }
            if let Some(cell) = self.cells.get(&pos) {
                pending.extend_from_slice(cell.referenced_cells());
            }
        }
        false
    }

    /// Brings every stale formula reachable from `roots` up to date,
    /// dependencies first, so that evaluating a formula never has to recurse
    /// through more than one level of uncached cells.
    pub(crate) fn settle(&self, roots: &[Position]) {
        let mut visited = HashSet::new();
        let mut pending: Vec<(Position, bool)> = roots.iter().map(|&pos| (pos, false)).collect();
        while let Some((pos, expanded)) = pending.pop() {
            let Some(cell) = self.cells.get(&pos) else {
                continue;
            };
            if expanded {
                cell.value(self);
                continue;
            }
            if !cell.is_formula() || cell.is_fresh() || !visited.insert(pos) {
                continue;
            }
            pending.push((pos, true));
            pending.extend(cell.referenced_cells().iter().map(|&dep| (dep, false)));
        }
    }
}

impl CellLookup for Sheet {
    fn value_at(&self, pos: Position) -> Option<Value> {
        if !pos.is_valid() {
            return Some(Value::Error(FormulaError::Ref));
        }
        self.cells.get(&pos).map(|cell| cell.value(self))
    }
}
