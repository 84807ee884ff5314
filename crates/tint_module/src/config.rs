//! Host configuration
//!
//! # Format
//!
//! ```toml
//! [modules]
//! search_paths = ["/usr/lib/tint", "~/.local/lib/tint"]
//! preferred = "lcm2"
//! cache_selections = true
//! host_api = "1.3.0"   # only to test compatibility gates
//!
//! [debug]
//! objects = "all"      # "all", an object id or a name substring
//! ```
//!
//! `TINT_MODULE_PATH` prepends search paths and `TINT_DEBUG_OBJECTS`
//! overrides the debug target.

use crate::error::{ModuleError, Result};
use crate::info::ModuleId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tint_core::debug::{set_debug_target, DebugTarget, DEBUG_OBJECTS_ENV};
use tint_core::{Version, HOST_API_VERSION};

/// Search path environment variable
pub const MODULE_PATH_ENV: &str = "TINT_MODULE_PATH";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModulesToml {
    #[serde(default)]
    search_paths: Vec<PathBuf>,
    preferred: Option<String>,
    cache_selections: Option<bool>,
    host_api: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DebugToml {
    objects: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    modules: ModulesToml,
    #[serde(default)]
    debug: DebugToml,
}

/// Configuration of a module registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// Directories scanned for module libraries, in priority order
    pub search_paths: Vec<PathBuf>,
    /// Module whose matching interfaces get boosted
    pub preferred_module: Option<ModuleId>,
    /// Object tracing target
    pub debug_objects: Option<DebugTarget>,
    pub cache_selections: bool,
    /// Host API to gate modules against
    pub host_api: Version,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            preferred_module: None,
            debug_objects: None,
            cache_selections: true,
            host_api: HOST_API_VERSION,
        }
    }
}

impl HostConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: ConfigToml = toml::from_str(content)?;
        let defaults = Self::default();

        let preferred_module = raw
            .modules
            .preferred
            .as_deref()
            .map(ModuleId::new)
            .transpose()?;

        let host_api = match raw.modules.host_api.as_deref() {
            Some(text) => Version::parse(text)
                .ok_or_else(|| ModuleError::Config(format!("invalid host_api '{}'", text)))?,
            None => defaults.host_api,
        };

        Ok(Self {
            search_paths: raw.modules.search_paths,
            preferred_module,
            debug_objects: raw.debug.objects.as_deref().map(DebugTarget::parse),
            cache_selections: raw
                .modules
                .cache_selections
                .unwrap_or(defaults.cache_selections),
            host_api,
        })
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Apply `TINT_MODULE_PATH` and `TINT_DEBUG_OBJECTS`
    pub fn with_env_overlay(self) -> Self {
        self.with_overlay(
            std::env::var_os(MODULE_PATH_ENV),
            std::env::var(DEBUG_OBJECTS_ENV).ok(),
        )
    }

    fn with_overlay(mut self, module_path: Option<std::ffi::OsString>, debug: Option<String>) -> Self {
        if let Some(paths) = module_path {
            let mut search_paths: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            search_paths.append(&mut self.search_paths);
            self.search_paths = search_paths;
        }
        if let Some(debug) = debug {
            self.debug_objects = Some(DebugTarget::parse(&debug));
        }
        self
    }

    pub fn host_api_version(&self) -> Version {
        self.host_api
    }

    pub fn preferred(&self) -> Option<ModuleId> {
        self.preferred_module
    }

    /// Install the configured debug target process-wide
    pub fn apply_debug_target(&self) {
        if let Some(target) = &self.debug_objects {
            set_debug_target(target.clone());
        }
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn preferred_module(mut self, id: ModuleId) -> Self {
        self.preferred_module = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = HostConfig::from_toml_str(
            r#"
            [modules]
            search_paths = ["/opt/tint", "/usr/lib/tint"]
            preferred = "lcm2"
            cache_selections = false
            host_api = "1.2"

            [debug]
            objects = "all"
            "#,
        )
        .unwrap();
        assert_eq!(config.search_paths.len(), 2);
        assert_eq!(config.preferred().map(|id| id.to_string()).as_deref(), Some("lcm2"));
        assert!(!config.cache_selections);
        assert_eq!(config.host_api_version(), Version::new(1, 2, 0));
        assert_eq!(config.debug_objects, Some(DebugTarget::All));
    }

    #[test]
    fn test_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            HostConfig::from_toml_str("[modules]\npreferred = \"toolong\""),
            Err(ModuleError::InvalidModuleId(_))
        ));
        assert!(matches!(
            HostConfig::from_toml_str("[modules]\nhost_api = \"x\""),
            Err(ModuleError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_toml_str("[modules]\nunknown = 1"),
            Err(ModuleError::Toml(_))
        ));
    }

    #[test]
    fn test_overlay_prepends_paths() {
        let joined = std::env::join_paths(["/env/a", "/env/b"]).unwrap();
        let config = HostConfig::default()
            .search_path("/config")
            .with_overlay(Some(joined), Some("7".to_string()));
        assert_eq!(
            config.search_paths,
            vec![PathBuf::from("/env/a"), PathBuf::from("/env/b"), PathBuf::from("/config")]
        );
        assert!(config.debug_objects.is_some());
    }
}
