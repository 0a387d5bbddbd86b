//! Module discovery and concurrent evaluation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::builtin::{RegimeBiasFactory, SpreadReversionFactory};
use super::{DecisionModule, EvaluationContext, ModuleConfig, ModuleFactory};
use crate::domain::{
    AccountSnapshot, MarketSnapshot, ModuleId, RegimeSnapshot, StrategySignal,
};

/// A configured module that was not loaded, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModule {
    pub id: String,
    pub reason: String,
}

/// Outcome of [`StrategyRegistry::discover`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub loaded: Vec<ModuleId>,
    pub skipped: Vec<SkippedModule>,
}

/// Registry of decision modules.
///
/// Modules are keyed by id. Evaluation runs every module on its own tokio
/// task, bounded by `max_parallel`; a failing, slow or panicking module is
/// replaced by a neutral HOLD signal and never affects its siblings.
pub struct StrategyRegistry {
    factories: HashMap<&'static str, Box<dyn ModuleFactory>>,
    modules: Vec<Arc<dyn DecisionModule>>,
    max_parallel: usize,
    module_timeout: Duration,
}

impl StrategyRegistry {
    /// Create an empty registry without factories.
    #[must_use]
    pub fn new(max_parallel: usize, module_timeout: Duration) -> Self {
        Self {
            factories: HashMap::new(),
            modules: Vec::new(),
            max_parallel: max_parallel.max(1),
            module_timeout,
        }
    }

    /// Create a registry with the built-in module factories registered.
    #[must_use]
    pub fn with_builtin(max_parallel: usize, module_timeout: Duration) -> Self {
        let mut registry = Self::new(max_parallel, module_timeout);
        registry.register_factory(Box::new(RegimeBiasFactory));
        registry.register_factory(Box::new(SpreadReversionFactory));
        registry
    }

    /// Register a factory. A later factory with the same kind replaces the earlier one.
    pub fn register_factory(&mut self, factory: Box<dyn ModuleFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    /// Register an already-built module.
    pub fn register(&mut self, module: Arc<dyn DecisionModule>) {
        self.modules.push(module);
    }

    /// Ids of loaded modules in registration order.
    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| m.id().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Instantiate every enabled module in `configs`.
    ///
    /// Disabled entries, unknown kinds, duplicate ids and factory errors are
    /// skipped and logged; discovery itself never fails.
    pub fn discover(&mut self, configs: &[ModuleConfig]) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut seen: HashSet<String> = self
            .modules
            .iter()
            .map(|m| m.id().as_str().to_string())
            .collect();

        for config in configs {
            if !config.enabled {
                debug!(module = %config.id, "Module disabled, skipping");
                report.skipped.push(SkippedModule {
                    id: config.id.clone(),
                    reason: "disabled".into(),
                });
                continue;
            }
            if seen.contains(&config.id) {
                warn!(module = %config.id, "Duplicate module id, skipping");
                report.skipped.push(SkippedModule {
                    id: config.id.clone(),
                    reason: "duplicate id".into(),
                });
                continue;
            }
            let Some(factory) = self.factories.get(config.kind.as_str()) else {
                warn!(module = %config.id, kind = %config.kind, "Unknown module kind, skipping");
                report.skipped.push(SkippedModule {
                    id: config.id.clone(),
                    reason: format!("unknown kind '{}'", config.kind),
                });
                continue;
            };
            match factory.init(config) {
                Ok(module) => {
                    info!(module = %config.id, kind = %config.kind, "Module loaded");
                    seen.insert(config.id.clone());
                    report.loaded.push(module.id().clone());
                    self.modules.push(Arc::from(module));
                }
                Err(e) => {
                    warn!(module = %config.id, error = %e, "Module failed to load, skipping");
                    report.skipped.push(SkippedModule {
                        id: config.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Evaluate every module concurrently against one snapshot.
    ///
    /// Always returns exactly one signal per registered module.
    pub async fn evaluate_all(
        &self,
        market: MarketSnapshot,
        account: AccountSnapshot,
        regime: RegimeSnapshot,
    ) -> BTreeMap<ModuleId, StrategySignal> {
        let ctx = Arc::new(EvaluationContext {
            market,
            account,
            regime,
        });
        let permits = Arc::new(Semaphore::new(self.max_parallel));
        let timeout = self.module_timeout;

        let handles: Vec<_> = self
            .modules
            .iter()
            .map(|outer| {
                let module = Arc::clone(outer);
                let ctx = Arc::clone(&ctx);
                let permits = Arc::clone(&permits);
                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| format!("worker pool closed: {e}"))?;
                    match tokio::time::timeout(timeout, module.evaluate(&ctx)).await {
                        Ok(Ok(signal)) => Ok(signal),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!("timed out after {} ms", timeout.as_millis())),
                    }
                });
                (Arc::clone(outer), handle)
            })
            .collect();

        let mut signals = BTreeMap::new();
        for (module, handle) in handles {
            let id = module.id().clone();
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) if join_error.is_panic() => Err("module panicked".to_string()),
                Err(join_error) => Err(format!("module task failed: {join_error}")),
            };
            let signal = match outcome {
                Ok(mut signal) => {
                    // A module cannot speak for another one.
                    signal.module_id = id.clone();
                    signal
                }
                Err(error) => {
                    warn!(module = %id, error = %error, "Module evaluation failed, using neutral signal");
                    StrategySignal::neutral(id.clone(), module.symbol().clone(), error)
                }
            };
            debug!(
                module = %id,
                action = %signal.action,
                symbol = %signal.symbol,
                confidence = signal.confidence,
                "Module evaluated"
            );
            signals.insert(id, signal);
        }
        signals
    }
}
