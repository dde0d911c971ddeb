use std::collections::HashSet;

use super::{COLLECTOR_NAMES, enabled_by_default};

/// Which collectors a `CollectorRegistry` builds.
#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    pub enabled_collectors: HashSet<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every collector that is on without an explicit flag.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            enabled_collectors: COLLECTOR_NAMES
                .iter()
                .filter(|name| enabled_by_default(name))
                .map(ToString::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled_collectors = collectors.iter().cloned().collect();
        self
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.contains(name)
    }
}
