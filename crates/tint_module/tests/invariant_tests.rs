//! Invariant tests for tint_module
//!
//! These tests verify loading, validation and ranking guarantees

use std::sync::Arc;
use tint_module::prelude::*;
use tint_module::{check, LibraryCache, ModuleHooks};
use tint_core::{Options, Status, Version};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Passthrough;

impl FilterRun for Passthrough {
    fn run(&self, _node: &dyn ProcessingNode, inputs: &[&[u8]], output: &mut Vec<u8>) -> Status {
        for input in inputs {
            output.extend_from_slice(input);
        }
        Status::OK
    }
}

struct Echo;

impl ExchangeHandler for Echo {
    fn handle(&self, command: &str, options: &Options) -> std::result::Result<Options, Status> {
        Ok(options.clone().with("command", command))
    }
}

struct FailingInit;

impl ModuleHooks for FailingInit {
    fn init(&self) -> Status {
        Status::error(3)
    }
}

fn exchange(registration: &str) -> ApiDecl {
    ApiDecl::new(
        ApiHeader::new(registration, Version::new(1, 0, 0)),
        ApiPayload::DataExchange(DataExchangeApi {
            handler: Some(Arc::new(Echo)),
            ui: None,
        }),
    )
}

fn registry(config: HostConfig, modules: StaticModules) -> ModuleRegistry {
    let registry = ModuleRegistry::with_library_cache(config, Arc::new(LibraryCache::new()));
    registry.add_source(Arc::new(modules));
    registry
}

/// INVARIANT: A processing record needs a run function and at least one connector
#[test]
fn invariant_processing_validation_gate() {
    init_logging();
    let id = ModuleId::new("gate").unwrap();
    let header = || ApiHeader::new("org/test/color/icc_color.gate", Version::new(1, 0, 0));

    let incomplete = Api::standalone(
        id,
        ApiDecl::new(header(), ApiPayload::DataProcessing(DataProcessingApi::default())),
    );
    assert_eq!(check(&incomplete), None);

    let socket = Connector::socket("out", "//color/image", 0, 1).unwrap();
    let complete = Api::standalone(
        id,
        ApiDecl::new(
            header(),
            ApiPayload::DataProcessing(DataProcessingApi {
                run: Some(Arc::new(Passthrough)),
                sockets: ConnectorSet::new(vec![socket]),
                ..Default::default()
            }),
        ),
    );
    assert_eq!(check(&complete), Some(ApiKind::DataProcessing));
}

/// INVARIANT: The preferred module's rank is boosted tenfold before sorting
#[test]
fn invariant_preferred_boost_orders_ranks() {
    init_logging();
    let preferred = ModuleId::new("bbbb").unwrap();
    let registry = registry(
        HostConfig::default().preferred_module(preferred),
        StaticModules::new("builtin")
            .add("aaaa", Arc::new(|| {
                ModuleDecl::new("aaaa", Version::new(1, 0, 0))
                    .api(exchange("org/test/color/icc_color.lcms"))
            }))
            .add("bbbb", Arc::new(|| {
                ModuleDecl::new("bbbb", Version::new(1, 0, 0))
                    .api(exchange("org/test/color/icc_color.lcm2"))
            })),
    );
    registry.load_all();

    let plain = tint_module::select::rank(
        registry.apis(),
        &SelectRequest::new("//color/icc_color._lcms"),
    );
    let raw: Vec<u32> = plain.iter().map(|r| r.rank).collect();
    assert_eq!(raw, vec![3, 2]);

    let ranked = registry.select(SelectRequest::new("//color/icc_color._lcms"));
    let ranks: Vec<(String, u32)> = ranked
        .iter()
        .map(|r| (r.module.to_string(), r.rank))
        .collect();
    assert_eq!(
        ranks,
        vec![("bbbb".to_string(), 20), ("aaaa".to_string(), 3)]
    );
}

/// INVARIANT: A module failing init is discarded without affecting its neighbours
#[test]
fn invariant_load_failure_is_isolated() {
    init_logging();
    let registry = registry(
        HostConfig::default(),
        StaticModules::new("builtin")
            .add("aaaa", Arc::new(|| {
                ModuleDecl::new("aaaa", Version::new(1, 0, 0)).api(exchange("org/test/exchange.a"))
            }))
            .add("bbbb", Arc::new(|| {
                ModuleDecl::new("bbbb", Version::new(1, 0, 0))
                    .hooks(Arc::new(FailingInit))
                    .api(exchange("org/test/exchange.b"))
            }))
            .add("cccc", Arc::new(|| {
                ModuleDecl::new("cccc", Version::new(1, 0, 0)).api(exchange("org/test/exchange.c"))
            })),
    );

    let report = registry.load_all();
    let loaded: Vec<String> = report.loaded.iter().map(|id| id.to_string()).collect();
    assert_eq!(loaded, vec!["aaaa", "cccc"]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].candidate.starts_with("bbbb"));
    assert_eq!(registry.failures(), report.failures);

    assert!(registry.best("exchange.a", ApiKind::DataExchange).is_ok());
    assert!(registry.best("exchange.c", ApiKind::DataExchange).is_ok());
    assert!(registry.best("exchange.b", ApiKind::DataExchange).is_err());
}

/// INVARIANT: A module whose whole chain is rejected is not loaded
#[test]
fn invariant_rejected_chain_discards_module() {
    init_logging();
    let registry = registry(
        HostConfig::default(),
        StaticModules::new("builtin").add("newr", Arc::new(|| {
            ModuleDecl::new("newr", Version::new(1, 0, 0)).api(ApiDecl::new(
                ApiHeader::new("org/test/exchange.new", Version::new(1, 0, 0))
                    .module_api(Version::new(2, 0, 0)),
                ApiPayload::DataExchange(DataExchangeApi {
                    handler: Some(Arc::new(Echo)),
                    ui: None,
                }),
            ))
        })),
    );
    let report = registry.load_all();
    assert!(report.loaded.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(registry.modules().is_empty());
}

/// INVARIANT: Modules built against a newer API than the host are rejected
#[test]
fn invariant_host_api_gates_modules() {
    init_logging();
    let config = HostConfig::from_toml_str("[modules]\nhost_api = \"1.1.0\"").unwrap();
    let registry = registry(
        config,
        StaticModules::new("builtin").add("modr", Arc::new(|| {
            ModuleDecl::new("modr", Version::new(1, 0, 0)).api(exchange("org/test/exchange.modr"))
        })),
    );
    assert_eq!(registry.load_all().failures.len(), 1);
}

/// INVARIANT: Unloadable libraries on the search path fail gracefully
#[test]
fn invariant_bogus_libraries_fail_gracefully() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let ext = std::env::consts::DLL_EXTENSION;
    for name in ["libtint_bad1_tint_module", "libtint_bad2_tint_module"] {
        std::fs::write(dir.path().join(format!("{}.{}", name, ext)), b"garbage").unwrap();
    }

    let cache = Arc::new(LibraryCache::new());
    let registry = ModuleRegistry::with_library_cache(
        HostConfig::default().search_path(dir.path()),
        cache.clone(),
    );
    let report = registry.load_all();
    assert!(report.loaded.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(cache.is_empty());
}

/// INVARIANT: Configuration files round trip into the registry
#[test]
fn invariant_config_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tint.toml");
    std::fs::write(
        &path,
        "[modules]\nsearch_paths = [\"/opt/tint\"]\npreferred = \"lcm2\"\n",
    )
    .unwrap();
    let config = HostConfig::load(&path).unwrap();
    assert_eq!(config.search_paths, vec![std::path::PathBuf::from("/opt/tint")]);
    assert_eq!(config.preferred(), Some(ModuleId::new("lcm2").unwrap()));
    assert!(HostConfig::load(dir.path().join("missing.toml")).is_err());
}
