//! TableStore — the named collection of [`Table`]s.
//!
//! Tables are created lazily on first reference and live for the process
//! lifetime. Lookup is case-insensitive and goes through a one-slot MRU
//! cache (feed traffic tends to hit the same table many records in a
//! row); misses fall back to a scan of the name-sorted list.
//!
//! The dump/load format is INI-like text: a `[Definition]` section naming
//! every table and its field labels, then one `[NAME]` section per table
//! with one `;`-joined row per line. The round trip is lossless as long
//! as field text contains no `;` or newline.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::DumpError;

use super::Table;

/// Row separator in dump files.
const DUMP_DELIM: char = ';';

/// Named collection of tables with a one-slot MRU lookup cache.
#[derive(Debug, Default)]
pub struct TableStore {
    /// Sorted by name, case-insensitive.
    tables: Vec<Table>,
    /// Index of the most recently returned table.
    mru: usize,
}

impl TableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables in name order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up `name` case-insensitively, creating the table when absent
    /// and `create` is set.
    pub fn get_or_create(&mut self, name: &str, create: bool) -> Option<&mut Table> {
        if let Some(cached) = self.tables.get(self.mru)
            && cached.name().eq_ignore_ascii_case(name)
        {
            return self.tables.get_mut(self.mru);
        }

        if let Some(index) = self
            .tables
            .iter()
            .position(|t| t.name().eq_ignore_ascii_case(name))
        {
            self.mru = index;
            return self.tables.get_mut(index);
        }

        if !create {
            return None;
        }

        let index = self
            .tables
            .partition_point(|t| t.name().to_ascii_lowercase() < name.to_ascii_lowercase());
        self.tables.insert(index, Table::new(name));
        self.mru = index;
        self.tables.get_mut(index)
    }

    /// Look up an existing table; never creates.
    pub fn get(&mut self, name: &str) -> Option<&mut Table> {
        self.get_or_create(name, false)
    }

    /// Shortcut: read a field of `table`'s current row by 1-based index.
    pub fn field_by_index(&mut self, table: &str, index: i64) -> Option<&str> {
        self.get(table)?.field_by_index(index)
    }

    /// Shortcut: read a field of `table`'s current row by name or index.
    pub fn field(&mut self, table: &str, field: &str) -> Option<&str> {
        self.get(table)?.field(field)
    }

    /// Write all tables to `w` in the dump format.
    ///
    /// # Errors
    ///
    /// Propagates IO errors from the writer.
    pub fn dump_to(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "[Definition]")?;
        for table in &self.tables {
            writeln!(w, "{}={}", table.name(), table.field_labels().join(";"))?;
        }
        for table in &self.tables {
            writeln!(w)?;
            writeln!(w, "[{}]", table.name())?;
            for row in table.rows() {
                writeln!(w, "{}", row.fields().join(";"))?;
            }
        }
        Ok(())
    }

    /// Dump all tables to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::Io`] when the file cannot be written.
    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<(), DumpError> {
        let mut file = std::fs::File::create(path)?;
        self.dump_to(&mut file)?;
        Ok(())
    }

    /// Load tables from `r`, replacing the rows of any table that appears
    /// in the dump. Numeric field labels mark unnamed positions.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError`] on IO failure or a row outside any section.
    pub fn load_from(&mut self, r: impl BufRead) -> Result<(), DumpError> {
        let mut section: Option<String> = None;
        for (number, line) in r.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = Some(name.to_string());
                if !name.eq_ignore_ascii_case("Definition")
                    && let Some(table) = self.get_or_create(name, true)
                {
                    table.clear();
                }
                continue;
            }

            match section.as_deref() {
                None => return Err(DumpError::OrphanLine { line: number + 1 }),
                Some(s) if s.eq_ignore_ascii_case("Definition") => {
                    self.load_definition(line);
                }
                Some(s) => {
                    let name = s.to_string();
                    if let Some(table) = self.get_or_create(&name, true) {
                        table.add_row(line, DUMP_DELIM);
                    }
                }
            }
        }
        Ok(())
    }

    /// Load tables from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError`] when the file cannot be read or parsed.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), DumpError> {
        let file = std::fs::File::open(path)?;
        self.load_from(io::BufReader::new(file))
    }

    /// One `NAME=field;field;...` definition line.
    fn load_definition(&mut self, line: &str) {
        let Some((name, labels)) = line.split_once('=') else {
            return;
        };
        let Some(table) = self.get_or_create(name, true) else {
            return;
        };
        if table.field_count() > 0 {
            return;
        }
        for label in labels.split(DUMP_DELIM).filter(|l| !l.is_empty()) {
            if label.parse::<usize>().is_ok() {
                // Positional label: the slot stays unnamed.
                table.add_unnamed_field();
            } else {
                table.add_field(label);
            }
        }
    }
}
