//! Kind-specific interface payloads
//!
//! Each capability kind appends its own required behaviour to the shared
//! header. Behaviour a module provides is expressed as trait objects; a
//! missing trait object is what validation reports as an incomplete record.

use crate::connector::Connector;
use crate::ui::ModuleUi;
use std::fmt;
use std::sync::Arc;
use tint_core::object::{Entity, NameType, Ref};
use tint_core::{ObjectId, Options, Status, Value};

// ========== Queries ==========

/// Capability questions asked during selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Value is the host API number; modules answer with compatibility
    HostCompatibility,
    PixelDataType,
    ChannelCount,
    SwapChannels,
    ChannelOffset,
    Planar,
    Flavour,
    Hdr,
    /// Value 1 is ICC
    ProfileFormat,
}

/// How strongly the caller wants a query satisfied
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Request {
    None,
    Slight,
    Mid,
    Much,
    /// Candidates that cannot handle the query are excluded
    Hard,
}

impl Request {
    /// Rank contributed when the query is supported
    pub const fn weight(self) -> i32 {
        match self {
            Request::None => 0,
            Request::Slight => 1,
            Request::Mid => 2,
            Request::Much => 3,
            Request::Hard => 4,
        }
    }
}

/// One capability question
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Query {
    pub kind: QueryKind,
    pub value: i64,
    pub request: Request,
}

impl Query {
    pub const fn new(kind: QueryKind, value: i64, request: Request) -> Self {
        Self { kind, value, request }
    }
}

/// Answer capability queries for an interface.
///
/// `rank` is the kind-specific confidence: `0` indifferent, positive
/// confident, negative an issue that excludes the candidate.
pub trait CanHandle: Send + Sync {
    fn can_handle(&self, query: QueryKind, value: i64) -> bool;

    fn rank(&self, queries: &[Query]) -> i32 {
        let mut rank = 0;
        for q in queries {
            if self.can_handle(q.kind, q.value) {
                rank += q.request.weight();
            } else if q.request == Request::Hard {
                return -1;
            }
        }
        rank
    }
}

// ========== Views handed to modules ==========

/// Read-only view of a processing node
pub trait ProcessingNode {
    fn node_id(&self) -> ObjectId;
    fn registration(&self) -> String;
    fn options(&self) -> Options;
    fn input_count(&self) -> usize;
    fn output_count(&self) -> usize;

    /// Serialized context built for this node, if any
    fn context(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Access to a processing graph for policy correction
pub trait GraphAccess {
    fn node_ids(&self) -> Vec<ObjectId>;
    fn node_registration(&self, node: ObjectId) -> Option<String>;
    fn node_options(&self, node: ObjectId) -> Option<Options>;
    /// Returns `false` if the node is not part of the graph
    fn set_node_option(&self, node: ObjectId, key: &str, value: Value) -> bool;
}

// ========== Profile tags ==========

/// Reads and writes one family of profile tags
pub trait TagCodec: Send + Sync {
    /// Decode a tag into values
    fn get_values(&self, tag: &[u8]) -> Result<Options, Status>;
    /// Encode values into a tag
    fn create(&self, values: &Options) -> Option<Vec<u8>>;
}

#[derive(Clone, Default)]
pub struct ProfileTagApi {
    pub codec: Option<Arc<dyn TagCodec>>,
}

// ========== Context builders ==========

/// Longest allowed context type tag
pub const CONTEXT_TYPE_MAX: usize = 8;

/// Builds the serialized context a processing node runs with
pub trait ContextBuilder: Send + Sync {
    fn context_to_mem(&self, node: &dyn ProcessingNode) -> Result<Vec<u8>, Status>;

    /// Custom description of the context built for `node`
    fn describe(&self, _node: &dyn ProcessingNode) -> Option<String> {
        None
    }
}

#[derive(Clone, Default)]
pub struct ContextBuilderApi {
    /// Tag of the produced context, at most [`CONTEXT_TYPE_MAX`] bytes
    pub context_type: String,
    pub builder: Option<Arc<dyn ContextBuilder>>,
    pub ui: Option<Ref<ModuleUi>>,
}

// ========== Data conversion ==========

/// Converts data between entity kinds
pub trait DataConverter: Send + Sync {
    fn convert(
        &self,
        input: &dyn Entity,
        output_type: &str,
        options: &Options,
    ) -> Result<Ref<dyn Entity>, Status>;
}

#[derive(Clone, Default)]
pub struct DataConvertApi {
    pub data_in: Vec<String>,
    pub data_out: Vec<String>,
    pub converter: Option<Arc<dyn DataConverter>>,
}

// ========== Data processing ==========

/// Processing function of a filter node
pub trait FilterRun: Send + Sync {
    /// Compute `output` from the data of each connected input
    fn run(&self, node: &dyn ProcessingNode, inputs: &[&[u8]], output: &mut Vec<u8>) -> Status;
}

/// Connector declarations of one side of a processing interface
#[derive(Clone, Default)]
pub struct ConnectorSet {
    pub connectors: Vec<Ref<Connector>>,
    /// Number of connectors in use
    pub count: usize,
    /// How many extra instances of the last connector may be added
    pub last_add: usize,
}

impl ConnectorSet {
    pub fn new(connectors: Vec<Ref<Connector>>) -> Self {
        let count = connectors.len();
        Self {
            connectors,
            count,
            last_add: 0,
        }
    }

    /// Allow `extra` repetitions of the last connector
    pub fn with_last_add(mut self, extra: usize) -> Self {
        self.last_add = extra;
        self
    }

    /// Whether the set declares at least one usable connector
    pub fn is_usable(&self) -> bool {
        !self.connectors.is_empty() && self.count > 0
    }

    /// Connector declaration for connection slot `index`
    pub fn get(&self, index: usize) -> Option<&Ref<Connector>> {
        let used = self.count.min(self.connectors.len());
        if index < used {
            self.connectors.get(index)
        } else if used > 0 && index < used + self.last_add {
            self.connectors.get(used - 1)
        } else {
            None
        }
    }

    /// Total connection slots including repetitions
    pub fn slots(&self) -> usize {
        match self.count.min(self.connectors.len()) {
            0 => 0,
            used => used + self.last_add,
        }
    }
}

#[derive(Clone, Default)]
pub struct DataProcessingApi {
    pub run: Option<Arc<dyn FilterRun>>,
    pub plugs: ConnectorSet,
    pub sockets: ConnectorSet,
    /// Free-form properties, e.g. `"cmm"`, `"lcms"`
    pub properties: Vec<String>,
    /// Context type this node needs from a context builder, if any
    pub context_type: String,
}

// ========== Device configuration ==========

/// One rule of a rank map comparing device configurations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankEntry {
    pub key: String,
    /// Added when both configurations carry equal values
    pub match_value: i32,
    /// Added when the values differ
    pub none_match: i32,
    /// Added when the key is missing
    pub not_found: i32,
}

/// Backend enumerating and ranking device configurations
pub trait DeviceBackend: Send + Sync {
    fn configs_from_pattern(&self, pattern: &str, options: &Options) -> Result<Vec<Options>, Status>;
    fn configs_modify(&self, configs: &mut Vec<Options>, options: &Options) -> Status;
    fn config_rank(&self, config: &Options) -> i32;
}

/// Small image identifying a module or device
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Icon {
    /// Format tag, e.g. `"png"`
    pub format: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct DeviceConfigApi {
    pub backend: Option<Arc<dyn DeviceBackend>>,
    pub rank_map: Vec<RankEntry>,
    pub ui: Option<Ref<ModuleUi>>,
    pub icon: Option<Icon>,
}

impl DeviceConfigApi {
    /// Score how well `candidate` fits `reference` according to the rank map
    pub fn rank_against(&self, reference: &Options, candidate: &Options) -> i32 {
        self.rank_map
            .iter()
            .map(|entry| match (reference.get(&entry.key), candidate.get(&entry.key)) {
                (Some(a), Some(b)) if a == b => entry.match_value,
                (Some(_), Some(_)) => entry.none_match,
                _ => entry.not_found,
            })
            .sum()
    }
}

// ========== Policy ==========

/// Graph correction policy
pub trait PolicyHandler: Send + Sync {
    fn correct(&self, graph: &dyn GraphAccess, flags: u32, options: &Options) -> Status;

    /// Registration to fall back to when nothing matches `registration`
    fn fallback(&self, _registration: &str, _options: &Options) -> Option<String> {
        None
    }

    /// Resolve a short name to a full one
    fn resolve_name(&self, _name: &str, _ty: NameType) -> Option<String> {
        None
    }
}

#[derive(Clone, Default)]
pub struct PolicyApi {
    /// Base registration pattern the policy applies to
    pub pattern: String,
    pub handler: Option<Arc<dyn PolicyHandler>>,
    pub ui: Option<Ref<ModuleUi>>,
}

// ========== Data exchange ==========

/// Generic command handler
pub trait ExchangeHandler: Send + Sync {
    fn handle(&self, command: &str, options: &Options) -> Result<Options, Status>;
}

#[derive(Clone, Default)]
pub struct DataExchangeApi {
    pub handler: Option<Arc<dyn ExchangeHandler>>,
    pub ui: Option<Ref<ModuleUi>>,
}

impl fmt::Debug for ConnectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorSet")
            .field("connectors", &self.connectors.len())
            .field("count", &self.count)
            .field("last_add", &self.last_add)
            .finish()
    }
}
