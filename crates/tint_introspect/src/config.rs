//! Traversal limits

use serde::{Deserialize, Serialize};

/// Most children kept per Leave
pub const MAX_CHILDREN: usize = 32;

/// Default depth ceiling for one branch
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Introspection settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectConfig {
    /// Deepest expanded level below a root; deeper branches are truncated
    pub max_depth: usize,
    /// Children kept per entity; the rest are dropped with a diagnostic
    pub max_children: usize,
    /// Add observer edges to the ownership edges each entity reports
    pub follow_observers: bool,
    /// When walking the live population, also walk objects that no unowned
    /// root reached, such as members of ownership cycles
    pub include_unreached: bool,
}

impl Default for IntrospectConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_children: MAX_CHILDREN,
            follow_observers: true,
            include_unreached: true,
        }
    }
}

impl IntrospectConfig {
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_children(mut self, count: usize) -> Self {
        self.max_children = count;
        self
    }

    pub fn follow_observers(mut self, follow: bool) -> Self {
        self.follow_observers = follow;
        self
    }

    pub fn include_unreached(mut self, include: bool) -> Self {
        self.include_unreached = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: IntrospectConfig = serde_json::from_str(r#"{ "max_depth": 4 }"#).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_children, MAX_CHILDREN);
        assert!(config.follow_observers);
    }
}
