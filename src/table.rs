//! In-memory localization table model
//!
//! A table is a header row of language names followed by data rows of
//! per-language text. Row 0 is always the header; data rows are indexed
//! from 1. Row id 0 doubles as the reserved empty-string sentinel, which
//! is why no data ever lives there.

use std::collections::HashMap;

/// Warning raised during language column resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWarning {
    pub message: String,
}

impl TableWarning {
    pub fn language_not_found(table: &str, language: &str) -> Self {
        Self {
            message: format!(
                "Language '{}' not found in header of table '{}', falling back to column 0",
                language, table
            ),
        }
    }
}

/// One localization table: header row plus per-language data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocTable {
    /// Table name (master table name is fixed by configuration,
    /// satellites are keyed by filename).
    pub name: String,
    /// Row 0 is the header (language names); data rows from 1.
    rows: Vec<Vec<String>>,
}

impl LocTable {
    /// Create a table from raw rows. Row 0 must be the header.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), rows }
    }

    /// Total row count, header included.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of data rows (header excluded).
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// The header row of language names, or an empty slice for an empty table.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Raw access to a row.
    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    /// Find the column for a language by case-insensitive header match.
    ///
    /// Returns `None` when the language is not declared in the header;
    /// callers are expected to fall back to column 0 (see
    /// [`LanguageColumns`]).
    pub fn language_column(&self, language: &str) -> Option<usize> {
        self.header()
            .iter()
            .position(|name| name.eq_ignore_ascii_case(language))
    }

    /// Text of a cell, addressed by data row and column.
    ///
    /// Returns the empty string when the cell is absent. A short row is a
    /// data-completeness problem reported upstream at parse/export time,
    /// not here.
    pub fn cell_text(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Text of a cell for a named language, with column-0 fallback when
    /// the language is missing from the header.
    pub fn cell_text_for_language(&self, row: usize, language: &str) -> &str {
        let column = self.language_column(language).unwrap_or(0);
        self.cell_text(row, column)
    }
}

/// Declared-language to column mapping for one table.
///
/// Resolved once per table so the missing-language warning is recorded
/// exactly once per language, not once per lookup. A missing language
/// deliberately degrades to column 0 (English) instead of failing, so
/// declaring a new language does not break existing tables.
#[derive(Debug, Clone)]
pub struct LanguageColumns {
    columns: HashMap<String, usize>,
    warnings: Vec<TableWarning>,
}

impl LanguageColumns {
    /// Resolve every declared language against the table header.
    pub fn resolve(table: &LocTable, declared: &[String]) -> Self {
        let mut columns = HashMap::new();
        let mut warnings = Vec::new();
        for language in declared {
            let key = language.to_lowercase();
            match table.language_column(language) {
                Some(column) => {
                    columns.insert(key, column);
                }
                None => {
                    columns.insert(key, 0);
                    warnings.push(TableWarning::language_not_found(&table.name, language));
                }
            }
        }
        Self { columns, warnings }
    }

    /// Column for a declared language; unresolved languages map to 0.
    pub fn column(&self, language: &str) -> usize {
        self.columns.get(&language.to_lowercase()).copied().unwrap_or(0)
    }

    /// Warnings recorded during resolution (one per missing language).
    pub fn warnings(&self) -> &[TableWarning] {
        &self.warnings
    }
}
