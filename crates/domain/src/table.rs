//! Table — a named, ordered row/field snapshot of one upstream data set.
//!
//! Rows hold their fields as text; numeric interpretation happens at read
//! time. Each table carries a field-name directory (position ↔ optional
//! declared name) that only grows as wider rows arrive, and a cursor
//! marking the current row. Field accessors resolve against the current
//! row; the cursor auto-resets from unset to the first row on access.

pub mod store;

use serde::{Deserialize, Serialize};

/// Field separator on the feed wire.
pub const FIELD_SEPARATOR: char = '|';

/// Whether a table is mid-transmission or fully received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecvState {
    Receiving,
    Complete,
}

/// One record of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    fn split(text: &str, delim: char) -> Self {
        Self {
            fields: text.split(delim).map(str::to_string).collect(),
        }
    }

    /// Fields of this row, in order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields in this row (may differ per row).
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A named table with an index to the current (active) row.
#[derive(Debug)]
pub struct Table {
    name: String,
    rows: Vec<Row>,
    /// Directory: position ↔ optional declared field name.
    field_names: Vec<Option<String>>,
    cursor: Option<usize>,
    state: RecvState,
}

impl Table {
    /// Create an empty table. A fresh table counts as complete until a
    /// transmission starts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            field_names: Vec::new(),
            cursor: None,
            state: RecvState::Complete,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> RecvState {
        self.state
    }

    pub fn set_state(&mut self, state: RecvState) {
        self.state = state;
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows in arrival order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Declared directory length — the widest row seen so far, or more if
    /// fields were declared explicitly.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    /// Current-row cursor, if set.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Overwrite the cursor. Used by iterating actions to save/restore
    /// their position around nested iteration.
    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = cursor;
    }

    /// Split `text` on `delim` and append it as a new row, widening the
    /// field directory when the row has more fields than seen before.
    pub fn add_row(&mut self, text: &str, delim: char) {
        let row = Row::split(text, delim);
        while self.field_names.len() < row.field_count() {
            self.field_names.push(None);
        }
        self.rows.push(row);
    }

    /// Declare a field name at the next directory position.
    ///
    /// Returns the 1-based position of the declared field.
    pub fn add_field(&mut self, name: impl Into<String>) -> usize {
        self.field_names.push(Some(name.into()));
        self.field_names.len()
    }

    /// Widen the directory by one unnamed position.
    pub fn add_unnamed_field(&mut self) -> usize {
        self.field_names.push(None);
        self.field_names.len()
    }

    /// Drop all rows and reset the cursor, keeping name and directory.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.cursor = None;
    }

    /// Resolve a declared field name (case-insensitive) to its 1-based
    /// position.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_names
            .iter()
            .position(|slot| {
                slot.as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .map(|pos| pos + 1)
    }

    /// Read the current row's field at a 1-based position.
    ///
    /// Sets the cursor to the first row when unset. Returns `None` for an
    /// empty table or an out-of-range position.
    pub fn field_by_index(&mut self, index: i64) -> Option<&str> {
        let row = self.current_row()?;
        if index < 1 {
            return None;
        }
        let pos = usize::try_from(index).ok()?;
        row.fields.get(pos - 1).map(String::as_str)
    }

    /// Read the current row's field by declared name, or by position when
    /// `field` is itself an integer.
    pub fn field(&mut self, field: &str) -> Option<&str> {
        if let Ok(index) = field.trim().parse::<i64>() {
            return self.field_by_index(index);
        }
        let index = i64::try_from(self.field_index(field)?).ok()?;
        self.field_by_index(index)
    }

    /// Overwrite the current row's field at a 1-based position with
    /// `value`, padding the row with empty fields up to the position.
    ///
    /// Ignored when the position exceeds the declared directory length or
    /// the table has no rows.
    pub fn set_field(&mut self, index: usize, value: &str) {
        if index < 1 || index > self.field_names.len() {
            return;
        }
        if self.rows.is_empty() {
            return;
        }
        let cursor = *self.cursor.get_or_insert(0);
        let Some(row) = self.rows.get_mut(cursor) else {
            return;
        };
        while row.fields.len() < index {
            row.fields.push(String::new());
        }
        row.fields[index - 1] = value.to_string();
    }

    /// Maximum display width per directory position across all rows.
    #[must_use]
    pub fn field_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.field_names.len()];
        for row in &self.rows {
            for (i, field) in row.fields.iter().enumerate() {
                let len = field.chars().count();
                if len > widths[i] {
                    widths[i] = len;
                }
            }
        }
        widths
    }

    /// Declared field names in directory order, rendering unnamed slots as
    /// their 1-based position.
    #[must_use]
    pub fn field_labels(&self) -> Vec<String> {
        self.field_names
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Some(name) => name.clone(),
                None => (i + 1).to_string(),
            })
            .collect()
    }

    fn current_row(&mut self) -> Option<&mut Row> {
        if self.rows.is_empty() {
            return None;
        }
        let cursor = *self.cursor.get_or_insert(0);
        self.rows.get_mut(cursor)
    }
}
