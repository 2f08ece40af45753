//! Runtime hash-to-text resolution
//!
//! Lookups happen in hot UI paths, so every failure mode is returned as
//! a status plus a human-readable placeholder string instead of a panic
//! or an error type. A stale id degrades to visible diagnostic text, it
//! never crashes the caller.

use std::collections::HashMap;

use crate::export::CanonicalDoc;
use crate::hash::{loc_hash, LocId, EMPTY_HASH};

/// Outcome of a lookup. Never raised, always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocStatus {
    Success,
    /// The hash exists in no known table - likely a stale reference
    /// after a content update.
    BadLocHashId,
    /// The table shrank; the indexed row is out of range.
    BadLocTableLine,
    /// The row exists but the language cell is empty.
    NoTextFoundForLanguage,
}

/// One registered table plus its hash index.
#[derive(Debug, Clone)]
struct RegisteredTable {
    doc: CanonicalDoc,
    /// hash -> row id, built from canonical row order. The empty-string
    /// sentinel lives at row 0 in every table.
    index: HashMap<i32, usize>,
}

impl RegisteredTable {
    fn new(doc: CanonicalDoc) -> Self {
        let mut index = HashMap::with_capacity(doc.ids.len() + 1);
        index.insert(EMPTY_HASH, 0);
        for (offset, identity) in doc.ids.iter().enumerate() {
            // Deduplicate by hash: canonical order wins, first in stays.
            index.entry(loc_hash(identity)).or_insert(offset + 1);
        }
        Self { doc, index }
    }
}

/// Resolves hash ids to language-specific text across all known tables.
///
/// Lookup order: live per-session index first (favors freshly pulled
/// data over stale generated code), then the preferred table, then every
/// table in registration order.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    tables: Vec<RegisteredTable>,
    preferred: Option<String>,
    live: Option<HashMap<i32, (usize, usize)>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical table. Registration order is scan order.
    pub fn register(&mut self, doc: CanonicalDoc) {
        self.tables.push(RegisteredTable::new(doc));
        // A registration invalidates any previously built live index.
        self.live = None;
    }

    /// Set the table consulted before the registration-order scan.
    pub fn set_preferred_table(&mut self, name: impl Into<String>) {
        self.preferred = Some(name.into());
    }

    /// Names of all registered tables.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.doc.name.as_str()).collect()
    }

    /// Look up a registered table by name.
    pub fn table(&self, name: &str) -> Option<&CanonicalDoc> {
        self.tables
            .iter()
            .find(|t| t.doc.name == name)
            .map(|t| &t.doc)
    }

    /// Build the per-session live index by scanning every registered
    /// table. Resolution prefers this index once built, so a live reload
    /// does not require regenerating the identifier module.
    pub fn rebuild_live_index(&mut self) {
        let mut live = HashMap::new();
        for (table_index, table) in self.tables.iter().enumerate() {
            for (hash, row) in &table.index {
                live.entry(*hash).or_insert((table_index, *row));
            }
        }
        self.live = Some(live);
    }

    /// Drop the live index, falling back to per-table indexes.
    pub fn invalidate_live_index(&mut self) {
        self.live = None;
    }

    fn find(&self, hash: i32) -> Option<(usize, usize)> {
        if let Some(live) = &self.live {
            if let Some(found) = live.get(&hash) {
                return Some(*found);
            }
        }

        if let Some(preferred) = &self.preferred {
            if let Some((table_index, table)) = self
                .tables
                .iter()
                .enumerate()
                .find(|(_, t)| &t.doc.name == preferred)
            {
                if let Some(row) = table.index.get(&hash) {
                    return Some((table_index, *row));
                }
            }
        }

        for (table_index, table) in self.tables.iter().enumerate() {
            if let Some(row) = table.index.get(&hash) {
                return Some((table_index, *row));
            }
        }
        None
    }

    /// Resolve a hash id to text in the requested language.
    ///
    /// Always returns a `(text, status)` pair; on failure the text is a
    /// diagnostic placeholder the caller can render.
    pub fn resolve(&self, hash: i32, language: &str) -> (String, LocStatus) {
        let Some((table_index, row)) = self.find(hash) else {
            let known = self.table_names().join(", ");
            return (
                format!("[loc hash {:#010x} not found in tables: {}]", hash, known),
                LocStatus::BadLocHashId,
            );
        };

        // Row 0 is the reserved empty-string sentinel for every table;
        // no table data is touched for it.
        if row == 0 {
            return (String::new(), LocStatus::Success);
        }

        let table = &self.tables[table_index];
        if row >= table.doc.table.row_count() {
            return (
                format!(
                    "[loc hash {:#010x}: row {} out of range in table '{}']",
                    hash, row, table.doc.name
                ),
                LocStatus::BadLocTableLine,
            );
        }

        let text = table.doc.table.cell_text_for_language(row, language);
        if text.is_empty() {
            return (
                format!(
                    "[no {} text for '{}' in table '{}']",
                    language,
                    table.doc.ids.get(row - 1).map(String::as_str).unwrap_or("?"),
                    table.doc.name
                ),
                LocStatus::NoTextFoundForLanguage,
            );
        }

        (text.to_string(), LocStatus::Success)
    }

    /// Resolve via the id newtype.
    pub fn resolve_id(&self, id: LocId, language: &str) -> (String, LocStatus) {
        self.resolve(id.to_hash(), language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::parse_canonical;

    fn master_doc() -> CanonicalDoc {
        parse_canonical(
            "master",
            "ID\tENGLISH\tSpanish\n\
             Hello_World\tHello, World!\t\u{00a1}Hola, Mundo!\n\
             Menu_Quit\tQuit\tSalir\n",
        )
        .unwrap()
    }

    fn satellite_doc() -> CanonicalDoc {
        parse_canonical(
            "satellite",
            "ID\tENGLISH\tSpanish\nExtra_Line\tExtra\tExtra ES\n",
        )
        .unwrap()
    }

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        resolver.register(master_doc());
        resolver.register(satellite_doc());
        resolver
    }

    #[test]
    fn test_resolve_success() {
        let resolver = resolver();
        let (text, status) = resolver.resolve(loc_hash("Hello_World"), "Spanish");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "\u{00a1}Hola, Mundo!");

        let (text, status) = resolver.resolve(loc_hash("Hello_World"), "English");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "Hello, World!");
    }

    #[test]
    fn test_sentinel_always_resolves_empty() {
        let resolver = resolver();
        for language in ["English", "Spanish", "Klingon"] {
            let (text, status) = resolver.resolve(EMPTY_HASH, language);
            assert_eq!(status, LocStatus::Success);
            assert_eq!(text, "");
        }
    }

    #[test]
    fn test_resolve_scans_satellites_in_registration_order() {
        let resolver = resolver();
        let (text, status) = resolver.resolve(loc_hash("Extra_Line"), "English");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "Extra");
    }

    #[test]
    fn test_bad_hash_names_all_tables() {
        let resolver = resolver();
        let (text, status) = resolver.resolve(loc_hash("Does_Not_Exist"), "English");
        assert_eq!(status, LocStatus::BadLocHashId);
        assert!(text.contains("master"));
        assert!(text.contains("satellite"));
    }

    #[test]
    fn test_shrunken_table_reports_bad_line() {
        // Register a full table, then replace it with a shorter one while
        // keeping a live index built from the original.
        let mut resolver = Resolver::new();
        resolver.register(master_doc());
        resolver.rebuild_live_index();
        let hash = loc_hash("Menu_Quit");

        let shrunk =
            parse_canonical("master", "ID\tENGLISH\tSpanish\nHello_World\tHello, World!\tHola\n")
                .unwrap();
        resolver.tables[0].doc = shrunk;

        let (text, status) = resolver.resolve(hash, "English");
        assert_eq!(status, LocStatus::BadLocTableLine);
        assert!(text.contains("out of range"));
    }

    #[test]
    fn test_empty_cell_reports_no_text() {
        let doc = parse_canonical(
            "master",
            "ID\tENGLISH\tSpanish\nHole\tEnglish text\t\n",
        );
        // parse_canonical keeps the empty trailing cell
        let doc = doc.unwrap();
        let mut resolver = Resolver::new();
        resolver.register(doc);

        let (text, status) = resolver.resolve(loc_hash("Hole"), "Spanish");
        assert_eq!(status, LocStatus::NoTextFoundForLanguage);
        assert!(text.contains("Hole"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_english_column() {
        let resolver = resolver();
        let (text, status) = resolver.resolve(loc_hash("Hello_World"), "Klingon");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "Hello, World!");
    }

    #[test]
    fn test_preferred_table_checked_first() {
        // Same identifier registered in two tables with different text.
        let a = parse_canonical("a", "ID\tENGLISH\nShared\tfrom a\n").unwrap();
        let b = parse_canonical("b", "ID\tENGLISH\nShared\tfrom b\n").unwrap();
        let mut resolver = Resolver::new();
        resolver.register(a);
        resolver.register(b);

        let hash = loc_hash("Shared");
        let (text, _) = resolver.resolve(hash, "English");
        assert_eq!(text, "from a");

        resolver.set_preferred_table("b");
        let (text, _) = resolver.resolve(hash, "English");
        assert_eq!(text, "from b");
    }

    #[test]
    fn test_live_index_preferred_over_table_scan() {
        let mut resolver = resolver();
        resolver.rebuild_live_index();
        let (text, status) = resolver.resolve(loc_hash("Menu_Quit"), "Spanish");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "Salir");
    }

    #[test]
    fn test_resolve_id_newtype() {
        let resolver = resolver();
        let id = LocId::from_identity("Hello_World");
        let (text, status) = resolver.resolve_id(id, "Spanish");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "\u{00a1}Hola, Mundo!");
    }
}
