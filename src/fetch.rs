//! Remote spreadsheet fetch boundary
//!
//! The host engine's networking stays outside this crate; the pipeline
//! only polls an opaque handle for progress/completed/failed and reads
//! the raw cell grids once the fetch is done. Two adapters are provided:
//! a file-backed one (JSON sheet dump, used by the CLI and CI) and a
//! static one for hosts that already hold the data in memory.

use std::fs;
use std::path::PathBuf;

use crate::sheet::RawSheet;

/// Opaque handle to one document's in-flight fetch.
///
/// Polled once per pipeline tick; must never block.
pub trait FetchHandle {
    /// Advance the fetch by one non-blocking step.
    fn poll(&mut self);
    /// Completion fraction in `0.0..=1.0`.
    fn progress(&self) -> f32;
    fn is_completed(&self) -> bool;
    fn has_failed(&self) -> bool;
    /// Failure diagnostic, once `has_failed` is true.
    fn error(&self) -> Option<&str>;
    /// Raw cell grids, valid once `is_completed` is true.
    fn sheets(&self) -> &[RawSheet];
}

/// Fetch adapter reading a JSON sheet dump from disk.
///
/// The dump is an array of `{title, hidden, cells}` objects. The read
/// happens on the first poll, so a freshly created handle reports
/// progress 0 and completes on the next tick.
#[derive(Debug)]
pub struct FileFetch {
    path: PathBuf,
    sheets: Vec<RawSheet>,
    completed: bool,
    error: Option<String>,
}

impl FileFetch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheets: Vec::new(),
            completed: false,
            error: None,
        }
    }
}

impl FetchHandle for FileFetch {
    fn poll(&mut self) {
        if self.completed || self.error.is_some() {
            return;
        }
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Vec<RawSheet>>(&text) {
                Ok(sheets) => {
                    self.sheets = sheets;
                    self.completed = true;
                }
                Err(e) => {
                    self.error = Some(format!("{}: {}", self.path.display(), e));
                }
            },
            Err(e) => {
                self.error = Some(format!("{}: {}", self.path.display(), e));
            }
        }
    }

    fn progress(&self) -> f32 {
        if self.completed {
            1.0
        } else {
            0.0
        }
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn sheets(&self) -> &[RawSheet] {
        &self.sheets
    }
}

/// Fetch adapter for data already in memory; completes immediately.
#[derive(Debug, Clone)]
pub struct StaticFetch {
    sheets: Vec<RawSheet>,
    failure: Option<String>,
}

impl StaticFetch {
    pub fn new(sheets: Vec<RawSheet>) -> Self {
        Self { sheets, failure: None }
    }

    /// A handle that reports failure, for injecting fetch errors.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sheets: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl FetchHandle for StaticFetch {
    fn poll(&mut self) {}

    fn progress(&self) -> f32 {
        if self.failure.is_some() {
            0.0
        } else {
            1.0
        }
    }

    fn is_completed(&self) -> bool {
        self.failure.is_none()
    }

    fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    fn error(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn sheets(&self) -> &[RawSheet] {
        &self.sheets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_fetch_completes_after_poll() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"title": "Main", "cells": [["ID", "English"], ["A", "a"]]}}]"#
        )
        .unwrap();

        let mut fetch = FileFetch::new(file.path());
        assert!(!fetch.is_completed());
        assert_eq!(fetch.progress(), 0.0);

        fetch.poll();
        assert!(fetch.is_completed());
        assert!(!fetch.has_failed());
        assert_eq!(fetch.progress(), 1.0);
        assert_eq!(fetch.sheets().len(), 1);
        assert_eq!(fetch.sheets()[0].title, "Main");
    }

    #[test]
    fn test_file_fetch_missing_file_fails() {
        let mut fetch = FileFetch::new("/definitely/not/here.json");
        fetch.poll();
        assert!(fetch.has_failed());
        assert!(fetch.error().unwrap().contains("not/here.json"));
    }

    #[test]
    fn test_file_fetch_bad_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let mut fetch = FileFetch::new(file.path());
        fetch.poll();
        assert!(fetch.has_failed());
    }

    #[test]
    fn test_static_fetch_immediate() {
        let fetch = StaticFetch::new(vec![]);
        assert!(fetch.is_completed());
        assert!(!fetch.has_failed());
    }

    #[test]
    fn test_static_fetch_failing() {
        let fetch = StaticFetch::failing("network down");
        assert!(fetch.has_failed());
        assert_eq!(fetch.error(), Some("network down"));
    }
}
