//! Response rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! upstream response + request path
//!     → RewriteTable::lookup (exact path match)
//!         None                 → pass through untouched
//!         RuleKind::ServerInfo → server_info.rs (full substitution)
//!         RuleKind::DeviceSettings
//!                              → settings.rs (field patch + region patch)
//!                              → notification check
//! ```
//!
//! # Design Decisions
//! - The table is built once from config and never mutated while serving
//! - Path sets are disjoint, so at most one rule fires per response
//! - Rules are pure functions over bytes or a `serde_json::Value` tree

pub mod interceptor;
pub mod server_info;
pub mod settings;

use std::collections::HashMap;

use crate::config::RewriteConfig;

pub use interceptor::{Disposition, Exchange, ResponseInterceptor};
pub use server_info::ServerInfo;
pub use settings::{patch_device_settings, PatchReport};

/// What a rule does to a matching response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Discard the upstream body and answer with the server-info payload.
    ServerInfo,
    /// Decode the body and force the device-settings fields.
    DeviceSettings,
}

/// Exact-match path → rule table.
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    rules: HashMap<String, RuleKind>,
}

impl RewriteTable {
    /// Build the table from validated configuration.
    pub fn from_config(config: &RewriteConfig) -> Self {
        let mut table = Self::default();
        for path in &config.server_info_paths {
            table.insert(path.clone(), RuleKind::ServerInfo);
        }
        for path in &config.settings_patch_paths {
            table.insert(path.clone(), RuleKind::DeviceSettings);
        }
        table
    }

    /// Register a rule. The first registration of a path wins.
    pub fn insert(&mut self, path: impl Into<String>, kind: RuleKind) {
        self.rules.entry(path.into()).or_insert(kind);
    }

    /// Rule for an exact path, if any.
    pub fn lookup(&self, path: &str) -> Option<RuleKind> {
        self.rules.get(path).copied()
    }

    /// Whether any rule applies to `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.rules.contains_key(path)
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = RewriteTable::from_config(&RewriteConfig::default());

        assert_eq!(table.len(), 7);
        assert_eq!(table.lookup("/6/t4/dev_serverinfo"), Some(RuleKind::ServerInfo));
        assert_eq!(table.lookup("/6/t3/dev_serverinfo"), Some(RuleKind::ServerInfo));
        assert_eq!(table.lookup("/6/t4/dev_iot_device_info"), Some(RuleKind::DeviceSettings));
        assert_eq!(table.lookup("/6/t3/dev_signup"), Some(RuleKind::DeviceSettings));
    }

    #[test]
    fn test_lookup_is_exact() {
        let table = RewriteTable::from_config(&RewriteConfig::default());

        assert_eq!(table.lookup("/6/t4/dev_device_info/"), None);
        assert_eq!(table.lookup("/6/T4/dev_device_info"), None);
        assert_eq!(table.lookup("/6/poll/t4/heartbeat"), None);
        assert!(!table.contains("/"));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut table = RewriteTable::default();
        table.insert("/a", RuleKind::ServerInfo);
        table.insert("/a", RuleKind::DeviceSettings);

        assert_eq!(table.lookup("/a"), Some(RuleKind::ServerInfo));
        assert_eq!(table.len(), 1);
    }
}
