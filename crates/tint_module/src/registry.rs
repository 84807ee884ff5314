//! Module registry
//!
//! Central registry that discovers, validates and ranks modules.
//!
//! ```text
//!   sources ──candidates──► open ──► build ──► module init ──► check each api
//!                                                               │
//!                                        api init ◄── valid ────┘
//!                                            │
//!   select(pattern, kind) ◄── valid apis ◄───┘
//! ```
//!
//! A candidate that fails to open, fails its init hook or ends up without a
//! single valid interface is discarded with a warning; loading continues
//! with the next candidate.

use crate::api::{Api, ApiKind};
use crate::check::{check_against, Validation};
use crate::config::HostConfig;
use crate::error::{ModuleError, Result};
use crate::handle::ModuleHandle;
use crate::info::{ModuleId, ModuleInfo};
use crate::library::LibraryCache;
use crate::message::{log_sink, MessageSink};
use crate::select::{rank, Ranked, SelectRequest, SelectionCache};
use crate::source::{Candidate, DynamicModules, ModuleSource};
use parking_lot::RwLock;
use std::sync::Arc;
use tint_core::object::Ref;
use tint_core::Options;

/// A candidate that could not be loaded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    pub candidate: String,
    pub source: String,
    pub message: String,
}

/// Outcome of a loading pass
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<ModuleId>,
    pub failures: Vec<LoadFailure>,
}

/// Registry of loaded modules
pub struct ModuleRegistry {
    config: HostConfig,
    sources: RwLock<Vec<Arc<dyn ModuleSource>>>,
    /// Loaded modules in discovery order
    modules: RwLock<Vec<Ref<ModuleHandle>>>,
    failures: RwLock<Vec<LoadFailure>>,
    selections: SelectionCache,
    libraries: Arc<LibraryCache>,
    sink: RwLock<MessageSink>,
}

impl ModuleRegistry {
    /// Create a registry using the process-wide library cache. Configured
    /// search paths become a dynamic source.
    pub fn new(config: HostConfig) -> Self {
        Self::with_library_cache(config, LibraryCache::shared())
    }

    pub fn with_library_cache(config: HostConfig, libraries: Arc<LibraryCache>) -> Self {
        config.apply_debug_target();
        let mut sources: Vec<Arc<dyn ModuleSource>> = Vec::new();
        if !config.search_paths.is_empty() {
            sources.push(Arc::new(DynamicModules::new(
                config.search_paths.clone(),
                libraries.clone(),
            )));
        }
        Self {
            config,
            sources: RwLock::new(sources),
            modules: RwLock::new(Vec::new()),
            failures: RwLock::new(Vec::new()),
            selections: SelectionCache::new(),
            libraries,
            sink: RwLock::new(log_sink()),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn library_cache(&self) -> &Arc<LibraryCache> {
        &self.libraries
    }

    /// Add a source; its candidates are considered on the next load
    pub fn add_source(&self, source: Arc<dyn ModuleSource>) {
        self.sources.write().push(source);
    }

    /// Channel handed to interfaces loaded from now on
    pub fn set_message_sink(&self, sink: MessageSink) {
        *self.sink.write() = sink;
    }

    // ========== Loading ==========

    /// Load every candidate of every source that is not loaded yet
    pub fn load_all(&self) -> LoadReport {
        let sources = self.sources.read().clone();
        let mut report = LoadReport::default();

        for source in &sources {
            for candidate in source.candidates() {
                if let Ok(id) = ModuleId::new(&candidate.id) {
                    if self.is_loaded(id) {
                        log::debug!("Module '{}' already loaded, skipping '{}'", id, candidate.name);
                        continue;
                    }
                }

                match self.load_candidate(source.as_ref(), &candidate) {
                    Ok(handle) => {
                        report.loaded.push((*handle).id());
                        self.modules.write().push(handle);
                    }
                    Err(e) => {
                        log::warn!("Discarding module '{}' from {}: {}", candidate.name, source.name(), e);
                        report.failures.push(LoadFailure {
                            candidate: candidate.name.clone(),
                            source: source.name().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        self.selections.clear();
        *self.failures.write() = report.failures.clone();
        log::info!(
            "Loaded {} modules, {} discarded",
            report.loaded.len(),
            report.failures.len()
        );
        report
    }

    /// Open, initialise and validate one candidate
    pub fn load_candidate(
        &self,
        source: &dyn ModuleSource,
        candidate: &Candidate,
    ) -> Result<Ref<ModuleHandle>> {
        let opened = source.open(candidate)?;
        let info = opened.decl.build(opened.lease.clone(), None)?;
        let module = info.id().to_string();

        let status = info.init();
        if status.is_error() {
            return Err(ModuleError::InitFailed { module, status });
        }
        if status.is_issue() {
            log::warn!("Module '{}' initialised with issue {}", module, status);
        }

        let host = self.config.host_api_version();
        let sink = self.sink.read().clone();
        let mut valid = 0;
        for api in info.apis() {
            match check_against(&api, host) {
                Ok(kind) => {
                    if let Some(lifecycle) = &api.header().lifecycle {
                        lifecycle.set_message_sink(sink.clone());
                        let status = lifecycle.init();
                        if status.is_error() {
                            log::warn!(
                                "{} '{}' of module '{}' failed to initialise: status {}",
                                kind,
                                api.registration(),
                                module,
                                status
                            );
                            api.set_validation(Validation::Rejected);
                            continue;
                        }
                    }
                    api.set_validation(Validation::Valid(kind));
                    valid += 1;
                }
                Err(_) => api.set_validation(Validation::Rejected),
            }
        }

        if valid == 0 {
            info.reset();
            return Err(ModuleError::NoValidInterface(module));
        }

        log::info!(
            "Loaded module '{}' v{} ({} of {} interfaces valid)",
            module,
            info.version(),
            valid,
            info.api_count()
        );
        Ok(ModuleHandle::new(
            candidate.name.clone(),
            source.name().to_string(),
            info,
            opened.lease,
        ))
    }

    /// Unload one module, running the reset hooks of its interfaces
    pub fn unload(&self, id: ModuleId) -> Result<()> {
        let handle = {
            let mut modules = self.modules.write();
            let index = modules
                .iter()
                .position(|h| (**h).id() == id)
                .ok_or_else(|| ModuleError::NotFound(id.to_string()))?;
            modules.remove(index)
        };
        self.selections.clear();
        Self::reset(&handle);
        log::info!("Unloaded module '{}'", id);
        Ok(())
    }

    /// Unload every module
    pub fn unload_all(&self) {
        let handles = std::mem::take(&mut *self.modules.write());
        self.selections.clear();
        for handle in handles.iter().rev() {
            Self::reset(handle);
        }
        if !handles.is_empty() {
            log::info!("Unloaded {} modules", handles.len());
        }
    }

    /// Unload everything and load again, re-validating every interface
    pub fn reload(&self) -> LoadReport {
        self.unload_all();
        self.load_all()
    }

    fn reset(handle: &ModuleHandle) {
        let info = handle.info();
        for api in info.apis().filter(|api| api.is_valid()) {
            if let Some(lifecycle) = &api.header().lifecycle {
                let status = lifecycle.reset();
                if !status.is_ok() {
                    log::warn!("Reset of '{}' returned {}", api.registration(), status);
                }
            }
        }
        let status = info.reset();
        if !status.is_ok() {
            log::warn!("Reset of module '{}' returned {}", info.id(), status);
        }
    }

    // ========== Queries ==========

    pub fn is_loaded(&self, id: ModuleId) -> bool {
        self.modules.read().iter().any(|h| (**h).id() == id)
    }

    /// Loaded modules in discovery order
    pub fn modules(&self) -> Vec<Ref<ModuleHandle>> {
        self.modules.read().clone()
    }

    pub fn module(&self, id: ModuleId) -> Option<Ref<ModuleInfo>> {
        self.modules
            .read()
            .iter()
            .find(|h| (***h).id() == id)
            .map(|h| h.info().clone())
    }

    /// Failures of the last loading pass
    pub fn failures(&self) -> Vec<LoadFailure> {
        self.failures.read().clone()
    }

    /// Valid interfaces in discovery order
    pub fn apis(&self) -> Vec<Ref<Api>> {
        self.modules()
            .iter()
            .flat_map(|h| h.info().apis())
            .filter(|api| api.is_valid())
            .collect()
    }

    pub fn apis_of_kind(&self, kind: ApiKind) -> Vec<Ref<Api>> {
        self.apis()
            .into_iter()
            .filter(|api| api.validation() == Validation::Valid(kind))
            .collect()
    }

    // ========== Selection ==========

    /// Rank valid interfaces against `request`. The configured preferred
    /// module applies unless the request names one.
    pub fn select(&self, mut request: SelectRequest) -> Vec<Ranked> {
        if request.preferred.is_none() {
            request.preferred = self.config.preferred();
        }
        if self.config.cache_selections {
            if let Some(cached) = self.selections.get(&request) {
                return cached;
            }
        }
        let ranked = rank(self.apis(), &request);
        if self.config.cache_selections {
            self.selections.insert(request, ranked.clone());
        }
        ranked
    }

    /// Highest ranked interface of `kind` matching `pattern`
    pub fn best(&self, pattern: &str, kind: ApiKind) -> Result<Ref<Api>> {
        self.select(SelectRequest::new(pattern).kind(kind))
            .into_iter()
            .next()
            .map(|r| r.api)
            .ok_or_else(|| ModuleError::NoMatch {
                kind: kind.to_string(),
                pattern: pattern.to_string(),
            })
    }

    /// Send `command` to the best data exchange interface for `pattern`
    pub fn handle(&self, pattern: &str, command: &str, options: &Options) -> Result<Options> {
        let api = self.best(pattern, ApiKind::DataExchange)?;
        let handler = api
            .as_data_exchange()
            .and_then(|p| p.handler.clone())
            .ok_or_else(|| ModuleError::call_failed(command, tint_core::Status::error(1)))?;
        handler
            .handle(command, options)
            .map_err(|status| ModuleError::call_failed(command, status))
    }

    /// Number of cached selections
    pub fn cached_selections(&self) -> usize {
        self.selections.len()
    }
}

impl Drop for ModuleRegistry {
    fn drop(&mut self) {
        self.unload_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiDecl, ApiHeader, ApiPayload};
    use crate::info::ModuleDecl;
    use crate::interfaces::{DataExchangeApi, ExchangeHandler};
    use crate::source::StaticModules;
    use tint_core::{Status, Version};

    struct Echo;

    impl ExchangeHandler for Echo {
        fn handle(&self, command: &str, options: &Options) -> std::result::Result<Options, Status> {
            Ok(options.clone().with("command", command))
        }
    }

    fn exchange_module(id: &'static str) -> ModuleDecl {
        ModuleDecl::new(id, Version::new(1, 0, 0)).api(ApiDecl::new(
            ApiHeader::new(format!("org/test/exchange.{}", id), Version::new(1, 0, 0)),
            ApiPayload::DataExchange(DataExchangeApi {
                handler: Some(Arc::new(Echo)),
                ui: None,
            }),
        ))
    }

    fn registry() -> ModuleRegistry {
        let registry =
            ModuleRegistry::with_library_cache(HostConfig::default(), Arc::new(LibraryCache::new()));
        registry.add_source(Arc::new(
            StaticModules::new("builtin")
                .add("exa1", Arc::new(|| exchange_module("exa1")))
                .add("exa2", Arc::new(|| exchange_module("exa2"))),
        ));
        registry
    }

    #[test]
    fn test_load_and_select() {
        let registry = registry();
        let report = registry.load_all();
        assert_eq!(report.loaded.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(registry.apis_of_kind(ApiKind::DataExchange).len(), 2);

        let best = registry.best("exchange", ApiKind::DataExchange).unwrap();
        assert_eq!(best.module().to_string(), "exa1");
        assert!(registry.best("exchange", ApiKind::Policy).is_err());
    }

    #[test]
    fn test_second_load_skips_loaded() {
        let registry = registry();
        registry.load_all();
        let report = registry.load_all();
        assert!(report.loaded.is_empty());
        assert_eq!(registry.modules().len(), 2);
    }

    #[test]
    fn test_unload_clears_selection_cache() {
        let registry = registry();
        registry.load_all();
        registry.select(SelectRequest::new("exchange"));
        assert_eq!(registry.cached_selections(), 1);

        let id = ModuleId::new("exa1").unwrap();
        registry.unload(id).unwrap();
        assert_eq!(registry.cached_selections(), 0);
        assert!(registry.module(id).is_none());
        assert!(matches!(registry.unload(id), Err(ModuleError::NotFound(_))));
    }

    #[test]
    fn test_handle_command() {
        let registry = registry();
        registry.load_all();
        let reply = registry
            .handle("exchange.exa2", "ping", &Options::new().with("n", 1))
            .unwrap();
        assert_eq!(reply.find_text("command"), Some("ping"));
        assert_eq!(reply.find_int("n"), Some(1));
    }
}
