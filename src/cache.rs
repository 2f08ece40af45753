//! Process-wide table cache
//!
//! Holds the resolver built from the canonical table files named in
//! configuration. Built lazily on first use, rebuilt wholesale via
//! `load()` after a generation run or an explicit refresh - never
//! mutated incrementally, so readers between ticks always see a
//! consistent snapshot.

use std::path::{Path, PathBuf};

use crate::config::LocConfig;
use crate::export::{import_canonical, ExportError};
use crate::resolve::Resolver;

#[derive(Debug)]
pub struct LocCache {
    config: LocConfig,
    /// Directory canonical paths are resolved against.
    root: PathBuf,
    resolver: Option<Resolver>,
}

impl LocCache {
    pub fn new(config: LocConfig, root: impl Into<PathBuf>) -> Self {
        Self { config, root: root.into(), resolver: None }
    }

    /// Rebuild the whole cache from the canonical files on disk.
    ///
    /// The master document registers first, satellites follow in
    /// configuration order; the live index is rebuilt so lookups prefer
    /// the freshly loaded data. On error the previous snapshot stays in
    /// place.
    pub fn load(&mut self) -> Result<(), ExportError> {
        let mut resolver = Resolver::new();
        let master = self.config.master.clone();

        let mut documents: Vec<_> = self.config.documents.iter().collect();
        documents.sort_by_key(|d| d.name != master);
        for document in documents {
            let path = self.root.join(&document.canonical_path);
            let doc = import_canonical(&document.name, &path)?;
            resolver.register(doc);
        }

        resolver.set_preferred_table(master);
        resolver.rebuild_live_index();
        self.resolver = Some(resolver);
        Ok(())
    }

    /// Drop the snapshot; the next `resolver()` call rebuilds it.
    pub fn invalidate(&mut self) {
        self.resolver = None;
    }

    /// The current resolver snapshot, built on first use.
    pub fn resolver(&mut self) -> Result<&Resolver, ExportError> {
        if self.resolver.is_none() {
            self.load()?;
        }
        Ok(self.resolver.as_ref().expect("loaded above"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LocConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::loc_hash;
    use crate::resolve::LocStatus;
    use std::fs;

    const CONFIG: &str = r#"
master = "master"
generated_module_path = "generated_ids.rs"

[[documents]]
name = "master"
remote_id = "doc-1"
canonical_path = "master.tsv"

[[languages]]
name = "English"
culture = "en-US"

[[languages]]
name = "Spanish"
culture = "es-ES"
"#;

    #[test]
    fn test_lazy_load_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("master.tsv"),
            "ID\tENGLISH\tSpanish\nHello_World\tHello, World!\tHola\n",
        )
        .unwrap();

        let config = LocConfig::parse(CONFIG).unwrap();
        let mut cache = LocCache::new(config, dir.path());

        let resolver = cache.resolver().unwrap();
        let (text, status) = resolver.resolve(loc_hash("Hello_World"), "Spanish");
        assert_eq!(status, LocStatus::Success);
        assert_eq!(text, "Hola");
    }

    #[test]
    fn test_invalidate_and_reload_sees_new_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.tsv");
        fs::write(&path, "ID\tENGLISH\tSpanish\nA\ta\tae\n").unwrap();

        let config = LocConfig::parse(CONFIG).unwrap();
        let mut cache = LocCache::new(config, dir.path());
        let (text, _) = cache.resolver().unwrap().resolve(loc_hash("A"), "English");
        assert_eq!(text, "a");

        fs::write(&path, "ID\tENGLISH\tSpanish\nA\tupdated\tae\n").unwrap();
        // Snapshot is stable until explicitly invalidated.
        let (text, _) = cache.resolver().unwrap().resolve(loc_hash("A"), "English");
        assert_eq!(text, "a");

        cache.invalidate();
        let (text, _) = cache.resolver().unwrap().resolve(loc_hash("A"), "English");
        assert_eq!(text, "updated");
    }

    #[test]
    fn test_load_failure_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.tsv");
        fs::write(&path, "ID\tENGLISH\tSpanish\nA\ta\tae\n").unwrap();

        let config = LocConfig::parse(CONFIG).unwrap();
        let mut cache = LocCache::new(config, dir.path());
        cache.load().unwrap();

        fs::remove_file(&path).unwrap();
        assert!(cache.load().is_err());
        // Old snapshot still answers.
        let (text, _) = cache.resolver().unwrap().resolve(loc_hash("A"), "English");
        assert_eq!(text, "a");
    }
}
