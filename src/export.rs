//! Canonical table export and re-import
//!
//! The canonical table file is tab-separated text: row 0 is
//! `ID<TAB>ENGLISH<TAB><lang1>...` with the non-English languages sorted
//! alphabetically, and each data row carries one cell per column in the
//! same order. Newlines inside a cell are already escaped to the two
//! characters `\n` by sanitization, so real line breaks only separate
//! rows.
//!
//! Export is the single point where an incomplete spreadsheet becomes a
//! hard stop: a row missing text for any declared language aborts the
//! write.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::sheet::ParsedRow;
use crate::table::LocTable;

/// Header name of the identifier column.
pub const ID_COLUMN: &str = "ID";
/// Header name of the English column.
pub const ENGLISH_COLUMN: &str = "ENGLISH";

/// Error during canonical export or import.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("row '{identity}' is missing text for language '{language}'")]
    MissingText { identity: String, language: String },
    #[error("canonical file {path}: {message}")]
    Malformed { path: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sort the declared non-English languages into canonical column order.
pub fn canonical_language_order(languages: &[String]) -> Vec<String> {
    let mut order: Vec<String> = languages
        .iter()
        .filter(|l| !l.eq_ignore_ascii_case("english"))
        .cloned()
        .collect();
    order.sort();
    order
}

/// Render the canonical table text for one document.
///
/// Rows are sorted by sanitized identifier (strict ordinal sort, for
/// reproducible diffs). Declared language names are matched against the
/// sheet header case-insensitively. Fails on the first row missing text
/// for any declared language.
pub fn render_canonical(rows: &[ParsedRow], languages: &[String]) -> Result<String, ExportError> {
    let order = canonical_language_order(languages);

    let mut sorted: Vec<&ParsedRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.identity.cmp(&b.identity));

    let mut out = String::new();
    out.push_str(ID_COLUMN);
    out.push('\t');
    out.push_str(ENGLISH_COLUMN);
    for language in &order {
        out.push('\t');
        out.push_str(language);
    }
    out.push('\n');

    for row in sorted {
        out.push_str(&row.identity);
        out.push('\t');
        out.push_str(&row.english);
        for language in &order {
            let text = row.text(language);
            if text.is_empty() {
                return Err(ExportError::MissingText {
                    identity: row.identity.clone(),
                    language: language.clone(),
                });
            }
            out.push('\t');
            out.push_str(text);
        }
        out.push('\n');
    }

    Ok(out)
}

/// Write the canonical table file for one document.
pub fn export_canonical(
    rows: &[ParsedRow],
    languages: &[String],
    path: &Path,
) -> Result<(), ExportError> {
    let text = render_canonical(rows, languages)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// A canonical table loaded back from disk.
///
/// `ids[k]` is the identifier of table row `k + 1`; row id 0 stays
/// reserved for the empty-string sentinel, which is exactly why data
/// rows start at 1.
#[derive(Debug, Clone)]
pub struct CanonicalDoc {
    pub name: String,
    pub ids: Vec<String>,
    pub table: LocTable,
}

impl CanonicalDoc {
    /// Row id (1-based) of an identifier, scanning canonical order.
    pub fn row_id(&self, identity: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == identity).map(|i| i + 1)
    }
}

/// Parse canonical table text back into a table.
///
/// The in-memory table drops the ID column: row 0 is the header of
/// language names (ENGLISH first), data rows carry per-language text.
/// Cell text is taken verbatim, so one export→import cycle is
/// byte-identical.
pub fn parse_canonical(name: &str, text: &str) -> Result<CanonicalDoc, ExportError> {
    let mut lines = text.lines();
    let header_line = lines.next().ok_or_else(|| ExportError::Malformed {
        path: name.to_string(),
        message: "empty file".to_string(),
    })?;

    let header: Vec<String> = header_line.split('\t').map(String::from).collect();
    if header.first().map(String::as_str) != Some(ID_COLUMN) {
        return Err(ExportError::Malformed {
            path: name.to_string(),
            message: format!("header must start with '{}'", ID_COLUMN),
        });
    }
    let column_count = header.len();

    let mut ids = Vec::new();
    let mut rows = vec![header[1..].to_vec()];
    for (index, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let cells: Vec<String> = line.split('\t').map(String::from).collect();
        if cells.len() != column_count {
            return Err(ExportError::Malformed {
                path: name.to_string(),
                message: format!(
                    "row {} has {} cells, expected {}",
                    index + 2,
                    cells.len(),
                    column_count
                ),
            });
        }
        ids.push(cells[0].clone());
        rows.push(cells[1..].to_vec());
    }

    Ok(CanonicalDoc {
        name: name.to_string(),
        ids,
        table: LocTable::new(name, rows),
    })
}

/// Load a canonical table file from disk.
pub fn import_canonical(name: &str, path: &Path) -> Result<CanonicalDoc, ExportError> {
    let text = fs::read_to_string(path)?;
    parse_canonical(name, &text)
}
