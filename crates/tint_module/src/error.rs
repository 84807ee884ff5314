//! Error types for the module runtime

use crate::check::Rejection;
use std::path::PathBuf;
use thiserror::Error;
use tint_core::{CoreError, Status};

/// Result type for module operations
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors that can occur while loading and using modules
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Failed to load dynamic library
    #[error("Failed to load library '{path}': {message}")]
    LoadError {
        path: PathBuf,
        message: String,
    },

    /// Library does not contain the module declaration
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound {
        library: String,
        symbol: String,
    },

    /// Library was built against another module ABI
    #[error("ABI mismatch in '{library}': module {found}, host {expected}")]
    AbiMismatch {
        library: String,
        found: String,
        expected: String,
    },

    /// Module identifier is not four ASCII characters
    #[error("Invalid module id '{0}'")]
    InvalidModuleId(String),

    /// Module init hook reported an error
    #[error("Module '{module}' failed to initialise: status {status}")]
    InitFailed {
        module: String,
        status: Status,
    },

    /// No interface of the module passed validation
    #[error("Module '{0}' exposes no valid interface")]
    NoValidInterface(String),

    /// Interface record failed validation
    #[error("{0}")]
    Rejected(Box<Rejection>),

    /// Module not loaded
    #[error("Module '{0}' not found")]
    NotFound(String),

    /// No interface matched a request
    #[error("No {kind} interface matches '{pattern}'")]
    NoMatch {
        kind: String,
        pattern: String,
    },

    /// A module hook reported an error status
    #[error("Module call '{call}' failed: status {status}")]
    CallFailed {
        call: String,
        status: Status,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    /// Create a load error
    pub fn load_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ModuleError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a symbol not found error
    pub fn symbol_not_found(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        ModuleError::SymbolNotFound {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    /// Create a failed call error
    pub fn call_failed(call: impl Into<String>, status: Status) -> Self {
        ModuleError::CallFailed {
            call: call.into(),
            status,
        }
    }
}
