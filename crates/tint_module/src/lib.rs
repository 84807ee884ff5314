//! # tint_module - Module Runtime
//!
//! Loads color management modules and picks the right one for a job:
//! - **Interfaces**: seven capability kinds sharing one header, chained per
//!   module
//! - **Validation**: a version gate and a completeness predicate per kind
//! - **Loading**: static tables and dynamic libraries found on search paths,
//!   shared through a reference counted library cache
//! - **Selection**: registration pattern matching, query ranks and a
//!   preferred module boost
//!
//! ## Example
//!
//! ```ignore
//! use tint_module::prelude::*;
//!
//! let registry = ModuleRegistry::new(HostConfig::load("tint.toml")?.with_env_overlay());
//! registry.load_all();
//! let cmm = registry.best("//color/icc_color", ApiKind::DataProcessing)?;
//! ```

pub mod api;
pub mod check;
pub mod config;
pub mod connector;
pub mod error;
pub mod handle;
pub mod info;
pub mod interfaces;
pub mod library;
pub mod message;
pub mod registry;
pub mod select;
pub mod source;
pub mod ui;

pub use api::{Api, ApiDecl, ApiHeader, ApiIter, ApiKind, ApiLifecycle, ApiPayload, NoLifecycle};
pub use check::{check, check_against, CheckIssue, Rejection, Validation};
pub use config::{HostConfig, MODULE_PATH_ENV};
pub use connector::{Connector, Direction};
pub use error::{ModuleError, Result};
pub use handle::ModuleHandle;
pub use info::{ModuleDecl, ModuleHooks, ModuleId, ModuleInfo, ModuleTexts};
pub use library::{LibraryCache, LibraryLease, ModuleDeclaration, MODULE_ABI_VERSION, MODULE_SUFFIX};
pub use message::{log_sink, MessageLevel, MessageSink};
pub use registry::{LoadFailure, LoadReport, ModuleRegistry};
pub use select::{Ranked, SelectRequest, SelectionCache, PREFERRED_BOOST};
pub use source::{Candidate, DynamicModules, ModuleFactory, ModuleSource, OpenedModule, StaticModules};
pub use ui::ModuleUi;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{Api, ApiDecl, ApiHeader, ApiKind, ApiLifecycle, ApiPayload};
    pub use crate::check::Validation;
    pub use crate::config::HostConfig;
    pub use crate::connector::Connector;
    pub use crate::error::{ModuleError, Result};
    pub use crate::info::{ModuleDecl, ModuleId, ModuleInfo};
    pub use crate::interfaces::*;
    pub use crate::registry::ModuleRegistry;
    pub use crate::select::{Ranked, SelectRequest};
    pub use crate::source::StaticModules;
    pub use crate::ui::ModuleUi;
}
