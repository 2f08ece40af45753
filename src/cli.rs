//! Command-line interface
//!
//! Dispatches the pipeline and lookup machinery behind four subcommands:
//! `generate` (full pipeline), `export` (canonical tables only),
//! `resolve` (one runtime lookup against the canonical files) and
//! `check` (verify canonical files and the generated module are
//! consistent).
//!
//! Document sheet dumps are read from `<sheets dir>/<document name>.json`
//! via the file-backed fetch adapter.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::cache::LocCache;
use crate::config::LocConfig;
use crate::export::export_canonical;
use crate::fetch::{FetchHandle, FileFetch};
use crate::hash::loc_hash;
use crate::idgen::{build_entries, generate_module};
use crate::pipeline::{GenerationPipeline, StepStatus};
use crate::resolve::LocStatus;
use crate::sheet::parse_sheets;
use crate::table::LanguageColumns;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Locpipe - localization data pipeline
#[derive(Parser)]
#[command(name = "locpipe")]
#[command(about = "Locpipe - spreadsheet to canonical tables, stable string ids and glyph atlases")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full generation pipeline: fetch, parse, export canonical
    /// tables, regenerate identifiers and synthesize atlases
    Generate {
        /// Project configuration file
        #[arg(short, long, default_value = "loc.toml")]
        config: PathBuf,

        /// Directory holding one JSON sheet dump per document
        #[arg(short, long, default_value = "sheets")]
        sheets: PathBuf,
    },

    /// Export canonical tables only, skipping identifier regeneration
    /// and atlas synthesis
    Export {
        /// Project configuration file
        #[arg(short, long, default_value = "loc.toml")]
        config: PathBuf,

        /// Directory holding one JSON sheet dump per document
        #[arg(short, long, default_value = "sheets")]
        sheets: PathBuf,
    },

    /// Resolve one identifier against the canonical tables on disk
    Resolve {
        /// Identifier to resolve (or a raw hash value with --hash)
        identifier: String,

        /// Language to resolve for
        #[arg(short, long, default_value = "English")]
        language: String,

        /// Treat the identifier argument as a numeric hash value
        #[arg(long)]
        hash: bool,

        /// Project configuration file
        #[arg(short, long, default_value = "loc.toml")]
        config: PathBuf,
    },

    /// Verify canonical tables parse and the generated identifier
    /// module is up to date
    Check {
        /// Project configuration file
        #[arg(short, long, default_value = "loc.toml")]
        config: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Generate { config, sheets } => run_generate(&config, &sheets),
        Commands::Export { config, sheets } => run_export(&config, &sheets),
        Commands::Resolve { identifier, language, hash, config } => {
            run_resolve(&identifier, &language, hash, &config)
        }
        Commands::Check { config } => run_check(&config),
    };
    ExitCode::from(code)
}

/// Directory configured paths resolve against: the config file's parent.
fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_config(path: &Path) -> Result<LocConfig, u8> {
    LocConfig::load(path).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_INVALID_ARGS
    })
}

fn run_generate(config_path: &Path, sheets_dir: &Path) -> u8 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let root = project_root(config_path);
    let mut pipeline = GenerationPipeline::new(config.clone(), &root);
    for document in &config.documents {
        let dump = sheets_dir.join(format!("{}.json", document.name));
        pipeline.add_fetch(&document.name, Box::new(FileFetch::new(dump)));
    }

    let status = pipeline.run_to_completion();
    for warning in pipeline.warnings() {
        eprintln!("Warning: {}", warning);
    }

    match status {
        StepStatus::Success => {
            println!(
                "Generated {} document(s) into {}",
                config.documents.len(),
                root.display()
            );
            EXIT_SUCCESS
        }
        _ => {
            for error in pipeline.errors() {
                eprintln!("Error: {}", error);
            }
            EXIT_ERROR
        }
    }
}

fn run_export(config_path: &Path, sheets_dir: &Path) -> u8 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let root = project_root(config_path);
    let languages = config.language_names();

    for document in &config.documents {
        let dump = sheets_dir.join(format!("{}.json", document.name));
        let mut fetch = FileFetch::new(&dump);
        fetch.poll();
        if fetch.has_failed() {
            eprintln!(
                "Error: document '{}': {}",
                document.name,
                fetch.error().unwrap_or("fetch failed")
            );
            return EXIT_ERROR;
        }

        let outcome = parse_sheets(fetch.sheets(), config.start_language_column);
        for warning in &outcome.warnings {
            eprintln!("Warning: document '{}': {}", document.name, warning.message);
        }
        if !outcome.is_ok() {
            for error in &outcome.errors {
                eprintln!("Error: document '{}': {}", document.name, error);
            }
            return EXIT_ERROR;
        }

        let path = root.join(&document.canonical_path);
        if let Err(e) = export_canonical(&outcome.rows, &languages, &path) {
            eprintln!("Error: document '{}': {}", document.name, e);
            return EXIT_ERROR;
        }
        println!("Exported {} row(s) to {}", outcome.rows.len(), path.display());
    }

    EXIT_SUCCESS
}

fn run_resolve(identifier: &str, language: &str, as_hash: bool, config_path: &Path) -> u8 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let hash = if as_hash {
        match identifier.parse::<i32>() {
            Ok(hash) => hash,
            Err(_) => {
                eprintln!("Error: '{}' is not a valid hash value", identifier);
                return EXIT_INVALID_ARGS;
            }
        }
    } else {
        loc_hash(identifier)
    };

    let mut cache = LocCache::new(config, project_root(config_path));
    let resolver = match cache.resolver() {
        Ok(resolver) => resolver,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };

    let (text, status) = resolver.resolve(hash, language);
    println!("{}", text);
    if status == LocStatus::Success {
        EXIT_SUCCESS
    } else {
        eprintln!("Error: {:?}", status);
        EXIT_ERROR
    }
}

fn run_check(config_path: &Path) -> u8 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let root = project_root(config_path);
    let mut tables = Vec::new();
    for document in &config.documents {
        let path = root.join(&document.canonical_path);
        match crate::export::import_canonical(&document.name, &path) {
            Ok(doc) => {
                let columns = LanguageColumns::resolve(&doc.table, &config.language_names());
                for warning in columns.warnings() {
                    eprintln!("Warning: {}", warning.message);
                }
                println!("{}: {} row(s)", document.name, doc.ids.len());
                tables.push(build_entries(&doc, &[]));
            }
            Err(e) => {
                eprintln!("Error: document '{}': {}", document.name, e);
                return EXIT_ERROR;
            }
        }
    }

    let expected = match generate_module(&tables, &config.master) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };
    let module_path = root.join(&config.generated_module_path);
    match fs::read_to_string(&module_path) {
        Ok(actual) if actual == expected => {
            println!("{} is up to date", module_path.display());
            EXIT_SUCCESS
        }
        Ok(_) => {
            eprintln!(
                "Error: {} is stale; rerun `locpipe generate`",
                module_path.display()
            );
            EXIT_ERROR
        }
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", module_path.display(), e);
            EXIT_ERROR
        }
    }
}
