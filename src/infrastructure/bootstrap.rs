//! Composition root: turns a [`Config`] into a wired runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::outbound::identity::LocalKeyIdentity;
use crate::adapter::outbound::memory::{MemoryLedger, MemoryPerformanceStore, MemoryRiskStore};
#[cfg(feature = "telegram")]
use crate::adapter::outbound::notifier::telegram::{TelegramConfig, TelegramNotifier};
use crate::adapter::outbound::paper::PaperBroker;
use crate::adapter::outbound::sqlite::database::open;
use crate::adapter::outbound::sqlite::{SqliteLedger, SqlitePerformanceStore, SqliteRiskStore};
use crate::application::aggregator::{ReplayGuard, SignalAggregator};
use crate::application::execution::{ExecutionRouter, RouterDeps};
use crate::application::pipeline::{AccountPipeline, Supervisor};
use crate::application::risk::RiskGate;
use crate::application::strategy::{DiscoveryReport, StrategyRegistry};
use crate::domain::AccountId;
use crate::error::Result;
use crate::infrastructure::config::{Config, Storage};
use crate::port::outbound::notifier::LogNotifier;
use crate::port::{
    Broker, IdentityService, LedgerStore, MarketDataProvider, NotifierRegistry, PerformanceStore,
    RiskStateStore,
};

/// Environment variable holding the hex private key of the master signer.
pub const SIGNING_KEY_ENV: &str = "WARDEN_SIGNING_KEY";

/// The three persistence ports, backed by one storage choice.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub risk: Arc<dyn RiskStateStore>,
    pub performance: Arc<dyn PerformanceStore>,
}

impl Stores {
    /// Open the configured storage, running migrations for SQLite.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        match config.storage {
            Storage::Sqlite => {
                let pool = open(&config.database)?;
                info!(database = %config.database, "SQLite storage ready");
                Ok(Self {
                    ledger: Arc::new(SqliteLedger::new(pool.clone())),
                    risk: Arc::new(SqliteRiskStore::new(pool.clone())),
                    performance: Arc::new(SqlitePerformanceStore::new(pool)),
                })
            }
            Storage::Memory => {
                warn!("In-memory storage: ledger and risk state are lost on exit");
                Ok(Self::memory())
            }
        }
    }

    /// Fresh in-memory stores.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            risk: Arc::new(MemoryRiskStore::new()),
            performance: Arc::new(MemoryPerformanceStore::new()),
        }
    }
}

/// Everything a command needs, wired from configuration.
pub struct Runtime {
    pub supervisor: Supervisor,
    pub gate: Arc<RiskGate>,
    pub stores: Stores,
    pub brokers: BTreeMap<AccountId, Arc<dyn Broker>>,
    pub notifier: Arc<NotifierRegistry>,
    pub discovery: DiscoveryReport,
}

impl Runtime {
    /// Broker of one account.
    #[must_use]
    pub fn broker(&self, account_id: &AccountId) -> Option<&Arc<dyn Broker>> {
        self.brokers.get(account_id)
    }
}

/// Build notifier registry from configuration.
#[cfg(feature = "telegram")]
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    if config.telegram.enabled {
        if let Some(tg_config) = TelegramConfig::from_env() {
            let tg_config = TelegramConfig {
                notify_executions: config.telegram.notify_executions,
                ..tg_config
            };
            registry.register(Box::new(TelegramNotifier::new(tg_config)));
            info!("Telegram notifier enabled");
        } else {
            warn!("Telegram enabled but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set");
        }
    }

    registry
}

/// Build notifier registry from configuration (non-telegram variant).
#[cfg(not(feature = "telegram"))]
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if config.telegram.enabled {
        warn!("Telegram enabled in config but the telegram feature is not compiled in");
    }
    registry
}

/// Build the signing identity, using `WARDEN_SIGNING_KEY` for the master
/// signer when set.
///
/// # Errors
/// Returns an error if the configured key does not parse.
pub fn build_identity(config: &Config) -> Result<LocalKeyIdentity> {
    let identity = LocalKeyIdentity::new();
    match std::env::var(SIGNING_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            Ok(identity.with_key(config.aggregator.signer_id.clone(), &key)?)
        }
        _ => Ok(identity),
    }
}

/// Wire the full runtime over the configured storage.
///
/// # Errors
/// Returns an error if storage cannot be opened or the signing key is invalid.
pub fn build(config: &Config) -> Result<Runtime> {
    let stores = Stores::open(config)?;
    build_with(config, stores)
}

/// Wire the full runtime over the given stores.
///
/// # Errors
/// Returns an error if the signing key is invalid.
pub fn build_with(config: &Config, stores: Stores) -> Result<Runtime> {
    let notifier = Arc::new(build_notifier_registry(config));
    let identity: Arc<dyn IdentityService> = Arc::new(build_identity(config)?);
    let market: Arc<dyn MarketDataProvider> = Arc::new(config.market.build());

    let mut registry = StrategyRegistry::with_builtin(
        config.registry.max_parallel,
        config.registry.module_timeout(),
    );
    let discovery = registry.discover(&config.strategies);
    let registry = Arc::new(registry);

    let gate = Arc::new(RiskGate::new(
        Arc::clone(&stores.risk),
        Arc::clone(&notifier),
        config.risk.clone().into(),
    ));
    let aggregator = Arc::new(SignalAggregator::new(
        Arc::clone(&stores.performance),
        identity,
        Arc::clone(&notifier),
        config.aggregator.clone().into(),
    ));
    let deps = RouterDeps {
        market: Arc::clone(&market),
        ledger: Arc::clone(&stores.ledger),
        gate: Arc::clone(&gate),
        signer: aggregator.signer(),
        master_signer: aggregator.settings().signer_id.clone(),
        replay: Arc::new(ReplayGuard::new(config.aggregator.replay_retention())),
        notifier: Arc::clone(&notifier),
    };

    let mut brokers: BTreeMap<AccountId, Arc<dyn Broker>> = BTreeMap::new();
    let mut pipelines = Vec::with_capacity(config.accounts.len());
    for account in &config.accounts {
        let account_id = AccountId::from(account.id.as_str());
        let broker: Arc<dyn Broker> = Arc::new(PaperBroker::with_fill_mode(
            account_id.clone(),
            account.starting_cash,
            account.fill_mode.into(),
        ));
        brokers.insert(account_id.clone(), Arc::clone(&broker));

        let router = ExecutionRouter::new(
            account_id,
            broker,
            deps.clone(),
            config.execution.clone().into(),
        );
        pipelines.push(Arc::new(AccountPipeline::new(
            config.universe(account),
            Arc::clone(&registry),
            Arc::clone(&aggregator),
            Arc::clone(&gate),
            Arc::clone(&market),
            router,
        )));
    }

    info!(
        accounts = pipelines.len(),
        modules = discovery.loaded.len(),
        skipped = discovery.skipped.len(),
        "Runtime wired"
    );

    Ok(Runtime {
        supervisor: Supervisor::new(pipelines, Arc::clone(&notifier)),
        gate,
        stores,
        brokers,
        notifier,
        discovery,
    })
}
