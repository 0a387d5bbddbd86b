//! Strategy registry configuration.

use std::time::Duration;

use serde::Deserialize;

/// Concurrency bounds for module evaluation (`[registry]`).
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Modules evaluated at once. Defaults to the number of CPUs.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Per-module evaluation timeout.
    #[serde(default = "default_module_timeout_ms")]
    pub module_timeout_ms: u64,
}

fn default_max_parallel() -> usize {
    num_cpus::get().max(1)
}

const fn default_module_timeout_ms() -> u64 {
    5_000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            module_timeout_ms: default_module_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn module_timeout(&self) -> Duration {
        Duration::from_millis(self.module_timeout_ms)
    }
}
