//! Spreadsheet parsing and sanitization
//!
//! Converts raw remote spreadsheet cells into parsed localization rows,
//! resolving per-language columns, stripping control markers and
//! normalizing newlines. Collects warnings for skippable problems and
//! errors for data-integrity problems, and keeps parsing after both so a
//! single run reports everything at once.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Marker the translators prepend to cells that still need work.
/// Stripped during sanitization, optionally together with one literal
/// newline that follows it.
pub const NEEDS_TRANSLATION_MARKER: &str = "#NEEDS_TRANSLATION#";

/// Sheet titles that never contain localization data.
const RESERVED_SHEET_NAMES: [&str; 5] = ["hub", "import", "key", "export", "template"];

/// Raw cell grid for one sheet, as delivered by a fetch handle.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSheet {
    pub title: String,
    #[serde(default)]
    pub hidden: bool,
    pub cells: Vec<Vec<String>>,
}

/// Data-integrity error found while parsing a spreadsheet.
///
/// Any of these fails the whole generation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error("sheet '{sheet}' row {row}: empty identifier")]
    EmptyIdentifier { sheet: String, row: usize },
    #[error(
        "duplicate identifier '{identity}' (first at sheet '{first_sheet}' row {first_row}, again at sheet '{second_sheet}' row {second_row})"
    )]
    DuplicateIdentifier {
        identity: String,
        first_sheet: String,
        first_row: usize,
        second_sheet: String,
        second_row: usize,
    },
}

/// Data-quality warning; logged, does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetWarning {
    pub message: String,
}

impl SheetWarning {
    fn missing_english(sheet: &str, row: usize, identity: &str) -> Self {
        Self {
            message: format!(
                "sheet '{}' row {}: '{}' has no English text, row skipped",
                sheet, row, identity
            ),
        }
    }
}

/// One sanitized localization row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Sanitized identifier (first cell).
    pub identity: String,
    /// Sanitized English text (second cell).
    pub english: String,
    /// Sanitized text per language header name, English included.
    pub texts: BTreeMap<String, String>,
    /// Sheet title the row came from (for diagnostics).
    pub sheet: String,
    /// 1-based row within that sheet.
    pub row: usize,
}

impl ParsedRow {
    /// Text for a language, matched against the sheet header name
    /// case-insensitively like every other language lookup. Returns the
    /// empty string when the language has no column.
    pub fn text(&self, language: &str) -> &str {
        self.texts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(language))
            .map(|(_, text)| text.as_str())
            .unwrap_or("")
    }
}

/// Result of parsing all sheets of one spreadsheet document.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub rows: Vec<ParsedRow>,
    /// Language names from the first data sheet's header, in header order.
    pub languages: Vec<String>,
    pub warnings: Vec<SheetWarning>,
    pub errors: Vec<SheetError>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whether a sheet should be skipped entirely (not an error).
fn is_skipped(sheet: &RawSheet) -> bool {
    sheet.hidden
        || sheet.cells.len() < 2
        || RESERVED_SHEET_NAMES
            .iter()
            .any(|name| sheet.title.eq_ignore_ascii_case(name))
}

/// Byte-level transcoding pass for header cells: NFC-normalize and trim,
/// so language names compare stably regardless of how the spreadsheet
/// backend encoded them.
fn transcode_header_cell(cell: &str) -> String {
    cell.nfc().collect::<String>().trim().to_string()
}

/// Sanitize one cell into its canonical single-line representation.
///
/// Strips carriage returns and the needs-translation marker (plus one
/// newline directly after it), then collapses the spreadsheet backend's
/// two-space soft line break and any raw newline into the escaped
/// two-character sequence `\n`, suitable for the tab-delimited export.
pub fn sanitize_cell(text: &str) -> String {
    let without_cr: String = text.chars().filter(|c| *c != '\r').collect();

    let mut stripped = without_cr.as_str();
    if let Some(rest) = stripped.strip_prefix(NEEDS_TRANSLATION_MARKER) {
        stripped = rest.strip_prefix('\n').unwrap_or(rest);
    }

    stripped.replace("  ", "\\n").replace('\n', "\\n")
}

/// Parse every sheet of one spreadsheet document.
///
/// `start_column` is the header column where language names begin
/// (identifier is column 0, English column 1 and normally the first
/// language). Duplicate identifiers across any two sheets of the same
/// document are a hard error reported with both locations.
pub fn parse_sheets(sheets: &[RawSheet], start_column: usize) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    // identity -> (sheet, row) of first definition
    let mut seen: BTreeMap<String, (String, usize)> = BTreeMap::new();

    for sheet in sheets {
        if is_skipped(sheet) {
            continue;
        }

        let header: Vec<String> = sheet.cells[0]
            .iter()
            .skip(start_column)
            .map(|cell| transcode_header_cell(cell))
            .filter(|name| !name.is_empty())
            .collect();

        if outcome.languages.is_empty() {
            outcome.languages = header.clone();
        }

        for (index, cells) in sheet.cells.iter().enumerate().skip(1) {
            let row = index + 1; // 1-based for diagnostics
            let identity = sanitize_cell(cells.first().map(String::as_str).unwrap_or(""));
            if identity.is_empty() {
                outcome.errors.push(SheetError::EmptyIdentifier {
                    sheet: sheet.title.clone(),
                    row,
                });
                continue;
            }

            let english = sanitize_cell(cells.get(1).map(String::as_str).unwrap_or(""));
            if english.is_empty() {
                outcome
                    .warnings
                    .push(SheetWarning::missing_english(&sheet.title, row, &identity));
                continue;
            }

            if let Some((first_sheet, first_row)) = seen.get(&identity) {
                outcome.errors.push(SheetError::DuplicateIdentifier {
                    identity: identity.clone(),
                    first_sheet: first_sheet.clone(),
                    first_row: *first_row,
                    second_sheet: sheet.title.clone(),
                    second_row: row,
                });
                continue;
            }
            seen.insert(identity.clone(), (sheet.title.clone(), row));

            let mut texts = BTreeMap::new();
            for (offset, language) in header.iter().enumerate() {
                let cell = cells
                    .get(start_column + offset)
                    .map(String::as_str)
                    .unwrap_or("");
                texts.insert(language.clone(), sanitize_cell(cell));
            }

            outcome.rows.push(ParsedRow {
                identity,
                english,
                texts,
                sheet: sheet.title.clone(),
                row,
            });
        }
    }

    outcome
}
