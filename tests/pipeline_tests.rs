//! Pipeline Integration Test Suite
//!
//! End-to-end tests driving the full generation pipeline from a project
//! configuration and on-disk JSON sheet dumps to canonical tables, the
//! generated identifier module, and runtime resolution.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use locpipe::cache::LocCache;
use locpipe::config::LocConfig;
use locpipe::fetch::FileFetch;
use locpipe::hash::{loc_hash, LocId};
use locpipe::pipeline::{GenerationPipeline, StepStatus};
use locpipe::resolve::LocStatus;

// ============================================================================
// Test Utilities
// ============================================================================

const CONFIG: &str = r#"
master = "master"
generated_module_path = "generated_ids.rs"

[[documents]]
name = "master"
remote_id = "doc-1"
canonical_path = "loc/master.tsv"

[[languages]]
name = "English"
culture = "en-US"

[[languages]]
name = "Spanish"
culture = "es-ES"

[[languages]]
name = "German"
culture = "de-DE"
"#;

const MASTER_SHEETS: &str = r#"[
  {
    "title": "Main",
    "cells": [
      ["ID", "English", "Spanish", "German"],
      ["Hello_World", "Hello, World!", "¡Hola, Mundo!", "Hallo, Welt!"],
      ["Menu_Quit", "Quit", "Salir", "Beenden"]
    ]
  },
  {
    "title": "Template",
    "cells": [
      ["ID", "English", "Spanish", "German"],
      ["Ignored", "never", "nunca", "niemals"]
    ]
  }
]"#;

/// Write a project into a temporary directory and return it.
fn create_project(sheets_json: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("loc.toml"), CONFIG).unwrap();
    let sheets = temp.path().join("sheets");
    fs::create_dir_all(&sheets).unwrap();
    fs::write(sheets.join("master.json"), sheets_json).unwrap();
    temp
}

/// Run the pipeline for a project directory to completion.
fn run_pipeline(root: &Path) -> (GenerationPipeline, StepStatus) {
    let config = LocConfig::load(&root.join("loc.toml")).unwrap();
    let mut pipeline = GenerationPipeline::new(config.clone(), root);
    for document in &config.documents {
        let dump = root.join("sheets").join(format!("{}.json", document.name));
        pipeline.add_fetch(&document.name, Box::new(FileFetch::new(dump)));
    }
    let status = pipeline.run_to_completion();
    (pipeline, status)
}

// ============================================================================
// End-to-End Generation
// ============================================================================

#[test]
fn test_full_run_produces_canonical_table() {
    let project = create_project(MASTER_SHEETS);
    let (pipeline, status) = run_pipeline(project.path());

    assert_eq!(status, StepStatus::Success);
    assert!(pipeline.errors().is_empty());

    let canonical = fs::read_to_string(project.path().join("loc/master.tsv")).unwrap();
    let mut lines = canonical.lines();
    // Non-English languages are sorted alphabetically after ENGLISH.
    assert_eq!(lines.next(), Some("ID\tENGLISH\tGerman\tSpanish"));
    assert_eq!(
        lines.next(),
        Some("Hello_World\tHello, World!\tHallo, Welt!\t\u{00a1}Hola, Mundo!")
    );
    assert_eq!(lines.next(), Some("Menu_Quit\tQuit\tBeenden\tSalir"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_full_run_produces_identifier_module() {
    let project = create_project(MASTER_SHEETS);
    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);

    let module = fs::read_to_string(project.path().join("generated_ids.rs")).unwrap();
    assert!(module.contains("pub const LOC_IDENTIFIER_COUNT: usize = 2;"));
    assert!(module.contains("pub mod master {"));
    assert!(module.contains("pub const EMPTY: i32 = 0;"));
    assert!(module.contains(&format!(
        "pub const Hello_World: i32 = {};",
        loc_hash("Hello_World")
    )));
    // Hash-to-row table starts at the reserved sentinel row.
    assert!(module.contains("(0, 0),"));
}

#[test]
fn test_reserved_sheet_is_skipped() {
    let project = create_project(MASTER_SHEETS);
    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);

    let canonical = fs::read_to_string(project.path().join("loc/master.tsv")).unwrap();
    assert!(!canonical.contains("Ignored"));
}

#[test]
fn test_rerun_is_byte_identical() {
    let project = create_project(MASTER_SHEETS);
    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);
    let canonical1 = fs::read_to_string(project.path().join("loc/master.tsv")).unwrap();
    let module1 = fs::read_to_string(project.path().join("generated_ids.rs")).unwrap();

    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);
    let canonical2 = fs::read_to_string(project.path().join("loc/master.tsv")).unwrap();
    let module2 = fs::read_to_string(project.path().join("generated_ids.rs")).unwrap();

    assert_eq!(canonical1, canonical2);
    assert_eq!(module1, module2);
}

// ============================================================================
// Generation to Resolution Round Trip
// ============================================================================

#[test]
fn test_generated_tables_resolve_at_runtime() {
    let project = create_project(MASTER_SHEETS);
    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);

    let config = LocConfig::load(&project.path().join("loc.toml")).unwrap();
    let mut cache = LocCache::new(config, project.path());
    let resolver = cache.resolver().unwrap();

    let (text, status) = resolver.resolve(loc_hash("Hello_World"), "Spanish");
    assert_eq!(status, LocStatus::Success);
    assert_eq!(text, "\u{00a1}Hola, Mundo!");

    let (text, status) = resolver.resolve(loc_hash("Menu_Quit"), "German");
    assert_eq!(status, LocStatus::Success);
    assert_eq!(text, "Beenden");

    // English resolves through the identifier column fallback path.
    let (text, status) = resolver.resolve(loc_hash("Hello_World"), "English");
    assert_eq!(status, LocStatus::Success);
    assert_eq!(text, "Hello, World!");
}

#[test]
fn test_empty_id_resolves_to_empty_string() {
    let project = create_project(MASTER_SHEETS);
    run_pipeline(project.path());

    let config = LocConfig::load(&project.path().join("loc.toml")).unwrap();
    let mut cache = LocCache::new(config, project.path());
    let resolver = cache.resolver().unwrap();

    let (text, status) = resolver.resolve_id(LocId::EMPTY, "Spanish");
    assert_eq!(status, LocStatus::Success);
    assert_eq!(text, "");
}

#[test]
fn test_unknown_hash_reports_tables_without_panicking() {
    let project = create_project(MASTER_SHEETS);
    run_pipeline(project.path());

    let config = LocConfig::load(&project.path().join("loc.toml")).unwrap();
    let mut cache = LocCache::new(config, project.path());
    let resolver = cache.resolver().unwrap();

    let (text, status) = resolver.resolve(loc_hash("No_Such_Id"), "Spanish");
    assert_eq!(status, LocStatus::BadLocHashId);
    assert!(text.contains("master"));
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_duplicate_identifier_fails_run() {
    let sheets = MASTER_SHEETS.replace("Menu_Quit", "Hello_World");
    let project = create_project(&sheets);
    let (pipeline, status) = run_pipeline(project.path());

    assert_eq!(status, StepStatus::Failed);
    assert!(pipeline.errors()[0].contains("duplicate identifier"));
    assert!(!project.path().join("loc/master.tsv").exists());
}

#[test]
fn test_missing_translation_fails_export() {
    let sheets = MASTER_SHEETS.replace("\"Salir\"", "\"\"");
    let project = create_project(&sheets);
    let (pipeline, status) = run_pipeline(project.path());

    assert_eq!(status, StepStatus::Failed);
    assert!(pipeline.errors()[0].contains("Menu_Quit"));
    assert!(pipeline.errors()[0].contains("Spanish"));
    assert!(!project.path().join("generated_ids.rs").exists());
}

#[test]
fn test_missing_sheet_dump_fails_fetch() {
    let project = create_project(MASTER_SHEETS);
    fs::remove_file(project.path().join("sheets/master.json")).unwrap();
    let (pipeline, status) = run_pipeline(project.path());

    assert_eq!(status, StepStatus::Failed);
    assert!(pipeline.errors()[0].starts_with("fetch:"));
}

#[test]
fn test_needs_translation_marker_is_stripped() {
    let sheets = MASTER_SHEETS.replace("Salir", "#NEEDS_TRANSLATION#Salir");
    let project = create_project(&sheets);
    let (_, status) = run_pipeline(project.path());
    assert_eq!(status, StepStatus::Success);

    let canonical = fs::read_to_string(project.path().join("loc/master.tsv")).unwrap();
    assert!(canonical.contains("\tSalir"));
    assert!(!canonical.contains("#NEEDS_TRANSLATION#"));
}
