//! Build-time generation pipeline
//!
//! A forward-only step machine driven by the host: each `tick()` advances
//! at most one step, so an editor can run the pipeline cooperatively and
//! report progress between frames; `run_to_completion()` loops the same
//! machine for headless use.
//!
//! Canonical sequence: fetch every configured document, parse and
//! sanitize, export canonical tables, regenerate the identifier module,
//! then the optional atlas sub-pipeline (font engine init, one atlas per
//! font group, fallback glyph pages). Any step failure halts the run
//! permanently with the aggregated error text; outputs written by earlier
//! steps stay on disk. Font engine resources are torn down whether the
//! run succeeds or fails.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::atlas::{
    assign_fallbacks, materialize, pack_fallback, search_atlas, EngineGlyphs, GlyphSource,
};
use crate::charset::RequiredChars;
use crate::config::LocConfig;
use crate::export::{export_canonical, import_canonical};
use crate::fetch::FetchHandle;
use crate::font::{FontEngine, FontSlot};
use crate::idgen::{build_entries, write_module, GeneratedTable};
use crate::sheet::{parse_sheets, ParseOutcome, RawSheet};

/// Status of the pipeline (and of each tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    Success,
    Failed,
}

/// Internal position in the step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetch,
    Parse,
    Export,
    Regenerate,
    AtlasInit,
    AtlasGroup(usize),
    Fallback,
    Done,
}

/// One document's fetch handle plus the grids it delivered.
struct DocumentFetch {
    name: String,
    handle: Box<dyn FetchHandle>,
    sheets: Vec<RawSheet>,
}

/// The generation pipeline for one configured project.
pub struct GenerationPipeline {
    config: LocConfig,
    /// Directory every configured path is resolved against.
    root: PathBuf,
    stage: Stage,
    status: StepStatus,
    fetches: Vec<DocumentFetch>,
    /// Parse outcome per document, in configuration order.
    outcomes: Vec<(String, ParseOutcome)>,
    warnings: Vec<String>,
    errors: Vec<String>,
    engine: Option<FontEngine>,
    /// Primary font slot per atlas group.
    group_slots: Vec<FontSlot>,
    /// (config index, slot) per successfully loaded fallback font.
    fallback_slots: Vec<(usize, FontSlot)>,
    /// Characters no primary atlas could carry, across all groups.
    missing: BTreeSet<char>,
    /// Union of every group's required set, for owner diagnostics.
    required_union: RequiredChars,
}

impl GenerationPipeline {
    pub fn new(config: LocConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
            stage: Stage::Fetch,
            status: StepStatus::Running,
            fetches: Vec::new(),
            outcomes: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            engine: None,
            group_slots: Vec::new(),
            fallback_slots: Vec::new(),
            missing: BTreeSet::new(),
            required_union: RequiredChars::default(),
        }
    }

    /// Register the fetch handle for one configured document. Every
    /// document needs a handle before the first tick.
    pub fn add_fetch(&mut self, document: &str, handle: Box<dyn FetchHandle>) {
        self.fetches.push(DocumentFetch {
            name: document.to_string(),
            handle,
            sheets: Vec::new(),
        });
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Name of the step the next tick will run.
    pub fn current_step(&self) -> &'static str {
        match self.stage {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Export => "export",
            Stage::Regenerate => "regenerate identifiers",
            Stage::AtlasInit => "font engine init",
            Stage::AtlasGroup(_) => "atlas",
            Stage::Fallback => "fallback glyphs",
            Stage::Done => "done",
        }
    }

    /// Data-quality warnings aggregated so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Error text of the failed step, empty while healthy.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Halt the run permanently. The font engine is dropped here so a
    /// failed run never leaks font resources.
    fn fail(&mut self, step: &str, message: String) -> StepStatus {
        self.errors.push(format!("{}: {}", step, message));
        self.status = StepStatus::Failed;
        self.stage = Stage::Done;
        self.engine = None;
        StepStatus::Failed
    }

    fn finish(&mut self) -> StepStatus {
        self.status = StepStatus::Success;
        self.stage = Stage::Done;
        self.engine = None;
        StepStatus::Success
    }

    /// Advance the pipeline by at most one step.
    pub fn tick(&mut self) -> StepStatus {
        match self.stage {
            Stage::Fetch => self.tick_fetch(),
            Stage::Parse => self.tick_parse(),
            Stage::Export => self.tick_export(),
            Stage::Regenerate => self.tick_regenerate(),
            Stage::AtlasInit => self.tick_atlas_init(),
            Stage::AtlasGroup(index) => self.tick_atlas_group(index),
            Stage::Fallback => self.tick_fallback(),
            Stage::Done => self.status,
        }
    }

    /// Tick until the run succeeds or fails.
    pub fn run_to_completion(&mut self) -> StepStatus {
        loop {
            match self.tick() {
                StepStatus::Running => continue,
                done => return done,
            }
        }
    }

    fn tick_fetch(&mut self) -> StepStatus {
        for document in &self.config.documents {
            if !self.fetches.iter().any(|f| f.name == document.name) {
                let name = document.name.clone();
                return self.fail("fetch", format!("no fetch registered for document '{}'", name));
            }
        }

        let mut all_done = true;
        for fetch in &mut self.fetches {
            fetch.handle.poll();
            if fetch.handle.has_failed() {
                let message = format!(
                    "document '{}': {}",
                    fetch.name,
                    fetch.handle.error().unwrap_or("unknown fetch error")
                );
                return self.fail("fetch", message);
            }
            if fetch.handle.is_completed() {
                if fetch.sheets.is_empty() {
                    fetch.sheets = fetch.handle.sheets().to_vec();
                }
            } else {
                all_done = false;
            }
        }

        if all_done {
            self.stage = Stage::Parse;
        }
        StepStatus::Running
    }

    fn tick_parse(&mut self) -> StepStatus {
        let start_column = self.config.start_language_column;
        let declared = self.config.language_names();
        let mut outcomes = Vec::new();
        let mut errors = Vec::new();

        for fetch in &self.fetches {
            let outcome = parse_sheets(&fetch.sheets, start_column);
            for warning in &outcome.warnings {
                self.warnings
                    .push(format!("document '{}': {}", fetch.name, warning.message));
            }
            for error in &outcome.errors {
                errors.push(format!("document '{}': {}", fetch.name, error));
            }
            // Compare the declared set against the header the sheets
            // actually carry, so a column missing for a whole document
            // is diagnosed here rather than row by row at export.
            if !outcome.rows.is_empty() {
                for language in &declared {
                    let found = outcome
                        .languages
                        .iter()
                        .any(|name| name.eq_ignore_ascii_case(language));
                    if !found {
                        self.warnings.push(format!(
                            "document '{}': declared language '{}' not found in sheet header",
                            fetch.name, language
                        ));
                    }
                }
            }
            outcomes.push((fetch.name.clone(), outcome));
        }

        if !errors.is_empty() {
            return self.fail("parse", errors.join("; "));
        }

        self.outcomes = outcomes;
        self.stage = Stage::Export;
        StepStatus::Running
    }

    fn tick_export(&mut self) -> StepStatus {
        let languages = self.config.language_names();
        for document in self.config.documents.clone() {
            let Some((_, outcome)) = self.outcomes.iter().find(|(name, _)| *name == document.name)
            else {
                continue;
            };
            let path = self.root.join(&document.canonical_path);
            if let Err(e) = export_canonical(&outcome.rows, &languages, &path) {
                return self.fail("export", format!("document '{}': {}", document.name, e));
            }
        }
        self.stage = Stage::Regenerate;
        StepStatus::Running
    }

    fn tick_regenerate(&mut self) -> StepStatus {
        let mut tables: Vec<GeneratedTable> = Vec::new();
        for document in self.config.documents.clone() {
            let path = self.root.join(&document.canonical_path);
            let doc = match import_canonical(&document.name, &path) {
                Ok(doc) => doc,
                Err(e) => {
                    return self
                        .fail("regenerate", format!("document '{}': {}", document.name, e));
                }
            };
            let parsed = self
                .outcomes
                .iter()
                .find(|(name, _)| *name == document.name)
                .map(|(_, outcome)| outcome.rows.as_slice())
                .unwrap_or(&[]);
            tables.push(build_entries(&doc, parsed));
        }

        let path = self.root.join(&self.config.generated_module_path);
        if let Err(e) = write_module(&tables, &self.config.master, &path) {
            return self.fail("regenerate", e.to_string());
        }

        if self.config.atlas.groups.is_empty() {
            return self.finish();
        }
        self.stage = Stage::AtlasInit;
        StepStatus::Running
    }

    fn tick_atlas_init(&mut self) -> StepStatus {
        let mut engine = FontEngine::new();

        for group in self.config.atlas.groups.clone() {
            let path = self.root.join(&group.font);
            let slot = match load_font(&mut engine, &path) {
                Ok(slot) => slot,
                // Primary font failures are fatal for the whole run.
                Err(message) => return self.fail("font engine init", message),
            };
            self.group_slots.push(slot);
        }

        for (index, font) in self.config.atlas.fallback_fonts.clone().iter().enumerate() {
            let path = self.root.join(font);
            match load_font(&mut engine, &path) {
                Ok(slot) => self.fallback_slots.push((index, slot)),
                // A broken fallback narrows coverage but never aborts.
                Err(message) => self
                    .warnings
                    .push(format!("fallback font skipped: {}", message)),
            }
        }

        self.engine = Some(engine);
        self.stage = Stage::AtlasGroup(0);
        StepStatus::Running
    }

    fn tick_atlas_group(&mut self, index: usize) -> StepStatus {
        let group = self.config.atlas.groups[index].clone();
        let padding = self.config.group_padding(&group);
        let min_font_size = self.config.atlas.min_font_size;
        let slot = self.group_slots[index];

        let mut required = RequiredChars::new();
        for (_, outcome) in &self.outcomes {
            for row in &outcome.rows {
                for language in &group.languages {
                    if let Some(text) = row.texts.get(language) {
                        required.add_text(&row.identity, text);
                    }
                }
            }
        }

        let engine = self.engine.as_ref().expect("engine lives until teardown");
        let glyphs = EngineGlyphs::new(engine, slot);
        let attempt = search_atlas(&glyphs, &required, min_font_size, padding);

        for &c in &attempt.missing {
            self.missing.insert(c);
        }
        // Merge character for character so no case expansion sneaks in
        // characters the group never required.
        for c in required.chars() {
            match required.owner(c) {
                Some(owner) => self.required_union.add_owned_char(c, owner),
                None => self.required_union.add_char(c),
            }
        }

        let name = font_stem(&group.font);
        let page = match materialize(engine, slot, &attempt, &name) {
            Ok(page) => page,
            Err(e) => return self.fail("atlas", e.to_string()),
        };
        if let Err(e) = self.write_page(&name, &page) {
            return self.fail("atlas", e);
        }

        if index + 1 < self.config.atlas.groups.len() {
            self.stage = Stage::AtlasGroup(index + 1);
        } else {
            self.stage = Stage::Fallback;
        }
        StepStatus::Running
    }

    fn tick_fallback(&mut self) -> StepStatus {
        if self.missing.is_empty() || self.fallback_slots.is_empty() {
            for &c in &self.missing {
                let owner = self.required_union.owner(c).unwrap_or("<built-in set>");
                self.warnings.push(format!(
                    "glyph U+{:04X} '{}' (first required by '{}') not found in the primary font or any fallback",
                    c as u32, c, owner
                ));
            }
            return self.finish();
        }

        let engine = self.engine.as_ref().expect("engine lives until teardown");
        let sources: Vec<EngineGlyphs> = self
            .fallback_slots
            .iter()
            .map(|&(_, slot)| EngineGlyphs::new(engine, slot))
            .collect();
        let chain: Vec<&dyn GlyphSource> = sources
            .iter()
            .map(|s| s as &dyn GlyphSource)
            .collect();

        let report = assign_fallbacks(&chain, &self.missing, &self.required_union);
        self.warnings.extend(report.warnings.iter().cloned());

        let font_size = self.config.atlas.fallback_font_size;
        let mut pages = Vec::new();
        for (chain_index, chars) in &report.owned {
            let (config_index, slot) = self.fallback_slots[*chain_index];
            let attempt = pack_fallback(&sources[*chain_index], chars, font_size, 2);
            let name = format!(
                "{}_fallback",
                font_stem(&self.config.atlas.fallback_fonts[config_index])
            );
            match materialize(engine, slot, &attempt, &name) {
                Ok(page) => pages.push((name, page)),
                Err(e) => return self.fail("fallback glyphs", e.to_string()),
            }
        }

        for (name, page) in pages {
            if let Err(e) = self.write_page(&name, &page) {
                return self.fail("fallback glyphs", e);
            }
        }

        self.finish()
    }

    /// Write one atlas page (PNG plus JSON metadata sidecar).
    fn write_page(&self, name: &str, page: &crate::atlas::AtlasPage) -> Result<(), String> {
        let dir = self.root.join("atlas");
        fs::create_dir_all(&dir).map_err(|e| e.to_string())?;

        let image_path = dir.join(format!("{}.png", name));
        page.image.save(&image_path).map_err(|e| e.to_string())?;

        let metadata = serde_json::to_string_pretty(&page.metadata).map_err(|e| e.to_string())?;
        fs::write(dir.join(format!("{}.json", name)), metadata).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Load one font file into the engine.
fn load_font(engine: &mut FontEngine, path: &Path) -> Result<FontSlot, String> {
    let name = font_stem(path);
    let bytes = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    engine
        .load(&name, &bytes)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

fn font_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string())
}
