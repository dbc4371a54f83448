//! Cell content and memoized values.
//!
//! A [`Cell`] never points at another cell. Everything it reads goes through
//! the [`Sheet`] by [`Position`], and its cached value is tagged with the
//! sheet's write counter at the time it was computed: any later write anywhere
//! in the sheet makes the cache stale.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};

use crate::error::Result;
use crate::formula::Formula;
use crate::position::Position;
use crate::sheet::Sheet;
use crate::value::Value;

/// Leading character marking formula input.
pub const FORMULA_SIGN: char = '=';
/// Leading character marking text that must be read literally.
pub const ESCAPE_SIGN: char = '\'';

/// Write counter shared by a sheet and all of its cells.
#[derive(Clone, Debug, Default)]
pub(crate) struct Revision(Rc<std::cell::Cell<u64>>);

impl Revision {
    pub(crate) fn current(&self) -> u64 {
        self.0.get()
    }

    pub(crate) fn bump(&self) {
        self.0.set(self.0.get().wrapping_add(1));
    }
}

#[derive(Debug, Default)]
enum Content {
    #[default]
    Empty,
    Text(String),
    Formula(Formula),
}

#[derive(Debug)]
struct Cached {
    revision: u64,
    value: Value,
}

#[derive(Debug)]
pub struct Cell {
    content: Content,
    cache: RefCell<Option<Cached>>,
    revision: Revision,
}

impl Cell {
    /// Creates an empty cell that is not yet stored anywhere, bound to `sheet`.
    pub fn new(sheet: &Sheet) -> Self {
        Self {
            content: Content::Empty,
            cache: RefCell::new(None),
            revision: sheet.revision(),
        }
    }

    /// Classifies `text` and stores it.
    ///
    /// - `""` is empty content.
    /// - `=` followed by at least one character is a formula. Every cell it
    ///   references that does not exist yet is created empty in `sheet`.
    /// - Anything else is text, stored verbatim.
    ///
    /// If the formula does not parse the cell keeps its previous content.
    pub fn set(&mut self, text: &str, sheet: &mut Sheet) -> Result<()> {
        let content = match text.strip_prefix(FORMULA_SIGN) {
            _ if text.is_empty() => Content::Empty,
            Some(expression) if !expression.is_empty() => {
                let formula = sheet.parser().parse(expression)?;
                for &pos in formula.referenced_cells() {
                    if sheet.get_cell(pos)?.is_none() {
                        debug!("creating empty cell {pos} referenced by formula");
                        sheet.set_cell(pos, "")?;
                    }
                }
                Content::Formula(formula)
            }
            _ => Content::Text(text.to_string()),
        };
        self.content = content;
        self.invalidate();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.content = Content::Empty;
        self.invalidate();
    }

    /// Current value of the cell. `sheet` must be the sheet this cell belongs to.
    ///
    /// Empty cells read as empty text, text loses one leading [`ESCAPE_SIGN`],
    /// formulas yield their number or error value.
    pub fn value(&self, sheet: &Sheet) -> Value {
        let revision = self.revision.current();
        if let Some(value) = self.cached(revision) {
            return value;
        }

        let value = match &self.content {
            Content::Empty => Value::default(),
            Content::Text(text) => Value::Text(
                text.strip_prefix(ESCAPE_SIGN)
                    .unwrap_or(text.as_str())
                    .to_string(),
            ),
            Content::Formula(formula) => {
                sheet.settle(formula.referenced_cells());
                let value = Value::from(formula.evaluate(sheet));
                trace!("recomputed ={} -> {value}", formula.expression());
                value
            }
        };

        *self.cache.borrow_mut() = Some(Cached {
            revision,
            value: value.clone(),
        });
        value
    }

    /// The content as it would be typed back in. Formulas use their canonical form.
    pub fn text(&self) -> String {
        match &self.content {
            Content::Empty => String::new(),
            Content::Text(text) => text.clone(),
            Content::Formula(formula) => format!("{FORMULA_SIGN}{}", formula.expression()),
        }
    }

    pub fn referenced_cells(&self) -> &[Position] {
        match &self.content {
            Content::Formula(formula) => formula.referenced_cells(),
            Content::Empty | Content::Text(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, Content::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.content, Content::Formula(_))
    }

    /// Whether the cached value is still current.
    pub(crate) fn is_fresh(&self) -> bool {
        self.cached(self.revision.current()).is_some()
    }

    fn cached(&self, revision: u64) -> Option<Value> {
        self.cache
            .borrow()
            .as_ref()
            .filter(|cached| cached.revision == revision)
            .map(|cached| cached.value.clone())
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = None;
        self.revision.bump();
    }
}
