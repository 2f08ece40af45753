//! Identifier module regeneration
//!
//! Deterministic transform from the canonical exported tables to a
//! generated Rust module: one constant per identifier per table (value =
//! its hash), a total-count constant, and a hash-to-row lookup table per
//! document built from canonical row order. Pure transform, no network,
//! no interaction; same input produces byte-identical output.

use std::fs;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::export::CanonicalDoc;
use crate::hash::{loc_hash, EMPTY_HASH};
use crate::sheet::ParsedRow;

/// Error during identifier module generation.
#[derive(Debug, Error)]
pub enum IdgenError {
    #[error("identifier '{0}' is not a legal constant name")]
    InvalidIdentifier(String),
    #[error("table name '{0}' is not a legal module name")]
    InvalidTableName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One generated localization entry.
///
/// Immutable once generated; `hash_value` is `loc_hash(identity)` and
/// `row_id` comes from canonical table order, not spreadsheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocEntry {
    pub identity: String,
    /// `<category>.<identity>`, category being the source sheet title.
    pub identity_with_category: String,
    pub hash_value: i32,
    pub english_text: String,
    pub row_id: usize,
}

/// Entries for one document, ready for module generation.
#[derive(Debug, Clone)]
pub struct GeneratedTable {
    pub name: String,
    pub entries: Vec<LocEntry>,
}

/// Build entries for one document by scanning canonical row order.
///
/// The parsed rows supply the source-sheet category; identifiers no
/// longer present there (none, in a normal run) fall back to an empty
/// category.
pub fn build_entries(doc: &CanonicalDoc, parsed: &[ParsedRow]) -> GeneratedTable {
    let entries = doc
        .ids
        .iter()
        .enumerate()
        .map(|(offset, identity)| {
            let row_id = offset + 1;
            let category = parsed
                .iter()
                .find(|row| &row.identity == identity)
                .map(|row| row.sheet.as_str())
                .unwrap_or("");
            LocEntry {
                identity: identity.clone(),
                identity_with_category: format!("{}.{}", category, identity),
                hash_value: loc_hash(identity),
                english_text: doc.table.cell_text(row_id, 0).to_string(),
                row_id,
            }
        })
        .collect();

    GeneratedTable { name: doc.name.clone(), entries }
}

fn ident_pattern() -> Regex {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
}

/// Render the generated identifier module.
///
/// One submodule per table. Constant declarations are sorted by strict
/// ordinal identifier sort for reproducible diffs; the hash-to-row table
/// keeps canonical row order and deduplicates by hash (first row wins).
/// The master table carries the reserved empty-string constant at 0.
pub fn generate_module(tables: &[GeneratedTable], master: &str) -> Result<String, IdgenError> {
    let ident = ident_pattern();

    let total: usize = tables.iter().map(|t| t.entries.len()).sum();

    let mut out = String::new();
    out.push_str("//! Generated localization identifiers.\n");
    out.push_str("//!\n");
    out.push_str("//! Regenerated by the locpipe pipeline; do not edit by hand.\n\n");
    out.push_str("#![allow(non_upper_case_globals)]\n\n");
    out.push_str("/// Total number of identifiers across all tables.\n");
    out.push_str(&format!("pub const LOC_IDENTIFIER_COUNT: usize = {};\n", total));

    for table in tables {
        if !ident.is_match(&table.name) {
            return Err(IdgenError::InvalidTableName(table.name.clone()));
        }

        out.push('\n');
        out.push_str(&format!("pub mod {} {{\n", table.name.to_lowercase()));

        if table.name == master {
            out.push_str("    /// Reserved empty-string id, present in every build.\n");
            out.push_str(&format!("    pub const EMPTY: i32 = {};\n\n", EMPTY_HASH));
        }

        let mut sorted: Vec<&LocEntry> = table.entries.iter().collect();
        sorted.sort_by(|a, b| a.identity.cmp(&b.identity));
        for entry in &sorted {
            if !ident.is_match(&entry.identity) {
                return Err(IdgenError::InvalidIdentifier(entry.identity.clone()));
            }
            out.push_str(&format!(
                "    pub const {}: i32 = {};\n",
                entry.identity, entry.hash_value
            ));
        }

        out.push_str("\n    /// Hash to row id, in canonical table order.\n");
        out.push_str("    pub static HASH_TO_ROW: &[(i32, u32)] = &[\n");
        out.push_str(&format!("        ({}, 0),\n", EMPTY_HASH));
        let mut seen = std::collections::HashSet::new();
        seen.insert(EMPTY_HASH);
        for entry in &table.entries {
            if seen.insert(entry.hash_value) {
                out.push_str(&format!(
                    "        ({}, {}),\n",
                    entry.hash_value, entry.row_id
                ));
            }
        }
        out.push_str("    ];\n");
        out.push_str("}\n");
    }

    Ok(out)
}

/// Generate and write the identifier module to disk.
pub fn write_module(
    tables: &[GeneratedTable],
    master: &str,
    path: &Path,
) -> Result<(), IdgenError> {
    let text = generate_module(tables, master)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
