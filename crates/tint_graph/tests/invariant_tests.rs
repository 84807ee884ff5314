//! Invariant tests for tint_graph
//!
//! These tests verify connection, ordering and run guarantees of processing
//! graphs built from registry modules

use std::sync::Arc;
use tint_core::object::NameType;
use tint_core::{Options, Status, Value, Version};
use tint_graph::prelude::*;
use tint_module::interfaces::*;
use tint_module::{
    ApiDecl, ApiHeader, ApiPayload, Connector, HostConfig, LibraryCache, ModuleDecl,
    ModuleRegistry, ModuleUi, StaticModules,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes a fixed pattern
struct Source;

impl FilterRun for Source {
    fn run(&self, _node: &dyn ProcessingNode, _inputs: &[&[u8]], output: &mut Vec<u8>) -> Status {
        output.extend_from_slice(&[1, 2, 3]);
        Status::OK
    }
}

/// Adds the first context byte to every input byte
struct Offset;

impl FilterRun for Offset {
    fn run(&self, node: &dyn ProcessingNode, inputs: &[&[u8]], output: &mut Vec<u8>) -> Status {
        let Some(offset) = node.context().and_then(|c| c.first().copied()) else {
            return Status::error(2);
        };
        for input in inputs {
            output.extend(input.iter().map(|b| b.wrapping_add(offset)));
        }
        Status::OK
    }
}

/// Serializes the `offset` option
struct OffsetContext;

impl ContextBuilder for OffsetContext {
    fn context_to_mem(&self, node: &dyn ProcessingNode) -> std::result::Result<Vec<u8>, Status> {
        let offset = node.options().find_int("offset").unwrap_or(10);
        Ok(vec![offset as u8])
    }
}

/// Sets `offset` on every node
struct OffsetPolicy;

impl PolicyHandler for OffsetPolicy {
    fn correct(&self, graph: &dyn GraphAccess, _flags: u32, options: &Options) -> Status {
        let offset = options.find_int("offset").unwrap_or(0);
        for node in graph.node_ids() {
            graph.set_node_option(node, "org/test/color/offset", Value::Int(offset));
        }
        Status::OK
    }
}

fn processing(registration: &str, run: Arc<dyn FilterRun>, with_plug: bool, context: &str) -> ApiDecl {
    let socket = Connector::socket("out", "//color/image", 0, 4).unwrap();
    let plugs = if with_plug {
        ConnectorSet::new(vec![Connector::plug("in", "//color/image", 1, 1).unwrap()])
    } else {
        ConnectorSet::default()
    };
    ApiDecl::new(
        ApiHeader::new(registration, Version::new(1, 0, 0)),
        ApiPayload::DataProcessing(DataProcessingApi {
            run: Some(run),
            plugs,
            sockets: ConnectorSet::new(vec![socket]),
            properties: Vec::new(),
            context_type: context.to_string(),
        }),
    )
}

fn test_module() -> ModuleDecl {
    let ui = ModuleUi::builder()
        .category("Color/CMM/test")
        .texts(&["name"])
        .get_text(Arc::new(|select: &str, _ty: NameType| {
            (select == "name").then(|| "Offset context".to_string())
        }))
        .build();

    ModuleDecl::new("test", Version::new(1, 0, 0))
        .name("Test filters")
        .api(processing("org/test/color/source", Arc::new(Source), false, ""))
        .api(processing("org/test/color/offset", Arc::new(Offset), true, "tst1"))
        .api(ApiDecl::new(
            ApiHeader::new("org/test/color/context", Version::new(1, 0, 0)),
            ApiPayload::ContextBuilder(ContextBuilderApi {
                context_type: "tst1".into(),
                builder: Some(Arc::new(OffsetContext)),
                ui: Some(ui),
            }),
        ))
        .api(ApiDecl::new(
            ApiHeader::new("org/test/color/policy", Version::new(1, 0, 0)),
            ApiPayload::Policy(PolicyApi {
                pattern: "org/test/color".into(),
                handler: Some(Arc::new(OffsetPolicy)),
                ui: None,
            }),
        ))
}

fn registry() -> ModuleRegistry {
    init_logging();
    let registry =
        ModuleRegistry::with_library_cache(HostConfig::default(), Arc::new(LibraryCache::new()));
    registry.add_source(Arc::new(
        StaticModules::new("builtin").add("test", Arc::new(test_module)),
    ));
    let report = registry.load_all();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    registry
}

/// INVARIANT: Nodes run after every node they read from
#[test]
fn invariant_run_follows_dependencies() {
    let registry = registry();
    let source = FilterNode::from_registry(&registry, "source").unwrap();
    let offset = FilterNode::from_registry(&registry, "offset").unwrap();

    let graph = FilterGraph::new();
    graph.add_node(&offset);
    graph.add_node(&source);
    connect(&source, 0, &offset, 0).unwrap();

    let order = graph.run(Some(&registry)).unwrap();
    assert_eq!(order, vec![source.id(), offset.id()]);
    assert_eq!(offset.output().unwrap().data(), &[11, 12, 13]);
    assert_eq!(offset.context_blob().unwrap().tag(), "tst1");
}

/// INVARIANT: Connections are typed, single per plug and never to the same node
#[test]
fn invariant_connect_checks() {
    let registry = registry();
    let source = FilterNode::from_registry(&registry, "source").unwrap();
    let first = FilterNode::from_registry(&registry, "offset").unwrap();
    let second = FilterNode::from_registry(&registry, "offset").unwrap();

    assert!(matches!(
        connect(&first, 0, &first, 0),
        Err(GraphError::SelfConnection(_))
    ));
    assert!(matches!(
        connect(&source, 0, &first, 3),
        Err(GraphError::NoSuchConnector { .. })
    ));

    connect(&source, 0, &first, 0).unwrap();
    assert!(matches!(
        connect(&second, 0, &first, 0),
        Err(GraphError::PlugOccupied { .. })
    ));

    assert!(disconnect(&first.plugs()[0]));
    assert!(!disconnect(&first.plugs()[0]));
    connect(&second, 0, &first, 0).unwrap();
}

/// INVARIANT: A cycle between nodes stops the run with the nodes involved
#[test]
fn invariant_cycle_is_reported() {
    let registry = registry();
    let a = FilterNode::from_registry(&registry, "offset").unwrap();
    let b = FilterNode::from_registry(&registry, "offset").unwrap();
    let graph = FilterGraph::new();
    graph.add_node(&a);
    graph.add_node(&b);
    connect(&a, 0, &b, 0).unwrap();
    connect(&b, 0, &a, 0).unwrap();

    match graph.run(Some(&registry)) {
        Err(GraphError::Cycle(ids)) => assert_eq!(ids, vec![a.id(), b.id()]),
        other => panic!("expected a cycle, got {:?}", other),
    }
}

/// INVARIANT: Required plugs must be connected before a run
#[test]
fn invariant_incomplete_graph_is_rejected() {
    let registry = registry();
    let offset = FilterNode::from_registry(&registry, "offset").unwrap();
    let graph = FilterGraph::new();
    graph.add_node(&offset);
    assert!(matches!(
        graph.run(Some(&registry)),
        Err(GraphError::Incomplete { index: 0, .. })
    ));
}

/// INVARIANT: Policy changes reach node options and invalidate contexts
#[test]
fn invariant_policy_correction_rebuilds_context() {
    let registry = registry();
    let source = FilterNode::from_registry(&registry, "source").unwrap();
    let offset = FilterNode::from_registry(&registry, "offset").unwrap();
    let graph = FilterGraph::new();
    graph.add_node(&source);
    graph.add_node(&offset);
    connect(&source, 0, &offset, 0).unwrap();

    graph.run(Some(&registry)).unwrap();
    assert_eq!(offset.output().unwrap().data(), &[11, 12, 13]);

    let status = graph
        .correct(&registry, "policy", 0, &Options::new().with("offset", 100))
        .unwrap();
    assert!(status.is_ok());
    assert!(offset.context_blob().is_none());

    graph.run(Some(&registry)).unwrap();
    assert_eq!(offset.output().unwrap().data(), &[101, 102, 103]);
}

/// INVARIANT: Edges between nodes do not keep either node alive
#[test]
fn invariant_edges_are_weak() {
    let registry = registry();
    let source = FilterNode::from_registry(&registry, "source").unwrap();
    let offset = FilterNode::from_registry(&registry, "offset").unwrap();
    connect(&source, 0, &offset, 0).unwrap();
    assert_eq!(source.sockets()[0].connection_count(), 1);

    drop(source);
    assert!(!offset.plugs()[0].is_connected());
}

/// INVARIANT: Runs without a registry fail for nodes needing a context
#[test]
fn invariant_context_requires_registry() {
    let registry = registry();
    let source = FilterNode::from_registry(&registry, "source").unwrap();
    let offset = FilterNode::from_registry(&registry, "offset").unwrap();
    let graph = FilterGraph::new();
    graph.add_node(&source);
    graph.add_node(&offset);
    connect(&source, 0, &offset, 0).unwrap();
    assert!(matches!(graph.run(None), Err(GraphError::NoContext { .. })));
}

/// INVARIANT: Object tracing never blocks a run, even when every retained
/// blob logs its parents
#[test]
fn invariant_run_with_object_tracing() {
    use std::sync::mpsc;
    use std::time::Duration;
    use tint_core::{set_debug_target, DebugTarget};

    init_logging();
    log::set_max_level(log::LevelFilter::Debug);
    set_debug_target(DebugTarget::Name("Blob".to_string()));

    let (done, finished) = mpsc::channel();
    std::thread::spawn(move || {
        let registry = registry();
        let source = FilterNode::from_registry(&registry, "source").unwrap();
        let offset = FilterNode::from_registry(&registry, "offset").unwrap();
        let graph = FilterGraph::new();
        graph.add_node(&source);
        graph.add_node(&offset);
        connect(&source, 0, &offset, 0).unwrap();
        graph.run(Some(&registry)).unwrap();
        done.send(offset.output().map(|b| b.data().to_vec())).ok();
    });

    let output = finished.recv_timeout(Duration::from_secs(10));
    set_debug_target(DebugTarget::Off);
    assert_eq!(output, Ok(Some(vec![11, 12, 13])));
}
