//! Where modules come from
//!
//! A [`ModuleSource`] lists candidates and opens them. Two sources ship
//! with the runtime: an in-process table of module builders and a search
//! path scanner for dynamic libraries.

use crate::error::{ModuleError, Result};
use crate::info::ModuleDecl;
use crate::library::{module_id_from_file_name, LibraryCache, LibraryLease, MODULE_SUFFIX};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// A module that can be opened
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// File name or table name
    pub name: String,
    /// Module id derived from the name
    pub id: String,
    /// Library path of dynamic candidates
    pub path: Option<PathBuf>,
}

/// An opened candidate. The declaration must not outlive the lease.
pub struct OpenedModule {
    pub decl: ModuleDecl,
    pub lease: Option<Arc<LibraryLease>>,
}

/// Provider of module candidates
pub trait ModuleSource: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates in discovery order
    fn candidates(&self) -> Vec<Candidate>;

    fn open(&self, candidate: &Candidate) -> Result<OpenedModule>;
}

/// Builder of an in-process module
pub type ModuleFactory = Arc<dyn Fn() -> ModuleDecl + Send + Sync>;

/// Modules compiled into the host
pub struct StaticModules {
    name: String,
    entries: Vec<(String, ModuleFactory)>,
}

impl StaticModules {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a module under its four character id
    pub fn add(mut self, id: impl Into<String>, factory: ModuleFactory) -> Self {
        self.entries.push((id.into(), factory));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModuleSource for StaticModules {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self) -> Vec<Candidate> {
        self.entries
            .iter()
            .map(|(id, _)| Candidate {
                name: format!("{}{}", id, MODULE_SUFFIX),
                id: id.clone(),
                path: None,
            })
            .collect()
    }

    fn open(&self, candidate: &Candidate) -> Result<OpenedModule> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(id, _)| *id == candidate.id)
            .ok_or_else(|| ModuleError::NotFound(candidate.id.clone()))?;
        Ok(OpenedModule {
            decl: factory(),
            lease: None,
        })
    }
}

/// Module libraries found on search paths
pub struct DynamicModules {
    search_paths: Vec<PathBuf>,
    cache: Arc<LibraryCache>,
}

impl DynamicModules {
    pub fn new(search_paths: Vec<PathBuf>, cache: Arc<LibraryCache>) -> Self {
        Self { search_paths, cache }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn cache(&self) -> &Arc<LibraryCache> {
        &self.cache
    }
}

impl ModuleSource for DynamicModules {
    fn name(&self) -> &str {
        "dynamic"
    }

    fn candidates(&self) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for dir in &self.search_paths {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::debug!("Skipping module path '{}': {}", dir.display(), e);
                    continue;
                }
            };

            let mut in_dir: Vec<Candidate> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
                })
                .filter_map(|path| {
                    let name = path.file_name()?.to_str()?.to_string();
                    let id = module_id_from_file_name(&name)?.to_string();
                    Some(Candidate {
                        name,
                        id,
                        path: Some(path),
                    })
                })
                .collect();
            in_dir.sort_by(|a, b| a.name.cmp(&b.name));

            // Earlier search paths shadow later ones
            for candidate in in_dir {
                if seen.insert(candidate.name.clone()) {
                    found.push(candidate);
                }
            }
        }

        found
    }

    fn open(&self, candidate: &Candidate) -> Result<OpenedModule> {
        let path = candidate
            .path
            .as_ref()
            .ok_or_else(|| ModuleError::NotFound(candidate.name.clone()))?;
        let lease = self.cache.acquire(path)?;
        let decl = lease.load_declaration(&candidate.id)?;
        Ok(OpenedModule {
            decl,
            lease: Some(Arc::new(lease)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tint_core::Version;

    #[test]
    fn test_static_candidates() {
        let source = StaticModules::new("builtin")
            .add("aaaa", Arc::new(|| ModuleDecl::new("aaaa", Version::new(1, 0, 0))))
            .add("bbbb", Arc::new(|| ModuleDecl::new("bbbb", Version::new(1, 0, 0))));
        let ids: Vec<String> = source.candidates().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["aaaa", "bbbb"]);

        let opened = source.open(&source.candidates()[1]).unwrap();
        assert_eq!(opened.decl.id(), "bbbb");
        assert!(opened.lease.is_none());
    }

    #[test]
    fn test_scan_filters_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        for name in [
            format!("libtint_lcm2_tint_module.{}", ext),
            format!("libtint_oyIM_tint_module.{}", ext),
            format!("libunrelated.{}", ext),
            "lcm2_tint_module.txt".to_string(),
        ] {
            std::fs::write(dir.path().join(name), b"not a library").unwrap();
        }

        let source = DynamicModules::new(
            vec![dir.path().to_path_buf(), dir.path().join("missing")],
            Arc::new(LibraryCache::new()),
        );
        let ids: Vec<String> = source.candidates().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["lcm2", "oyIM"]);
    }
}
