//! Locpipe - localization data pipeline
//!
//! This library provides functionality to:
//! - Hash string identifiers to stable 32-bit ids and resolve them to
//!   localized text at runtime in O(1)
//! - Run the build-time generation pipeline: fetch spreadsheet documents,
//!   sanitize and export canonical tab-separated tables, and regenerate
//!   the identifier constants module
//! - Synthesize optimally sized glyph atlases (with fallback font
//!   chains) for the characters each language group actually uses

pub mod atlas;
pub mod cache;
pub mod charset;
pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod font;
pub mod hash;
pub mod idgen;
pub mod pipeline;
pub mod resolve;
pub mod sheet;
pub mod table;
