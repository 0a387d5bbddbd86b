//! Runs every account pipeline in isolation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::{AccountPipeline, CycleReport};
use crate::application::execution::ReconcileReport;
use crate::domain::AccountId;
use crate::port::{Event, NotifierRegistry};

/// Result of one account's cycle, as seen by the supervisor.
#[derive(Debug)]
pub struct AccountOutcome {
    pub account_id: AccountId,
    pub result: Result<CycleReport, String>,
}

/// Drives all account pipelines.
///
/// An error or panic in one account is logged and reported, and never
/// aborts or delays the others.
pub struct Supervisor {
    pipelines: Vec<Arc<AccountPipeline>>,
    notifier: Arc<NotifierRegistry>,
}

impl Supervisor {
    pub fn new(pipelines: Vec<Arc<AccountPipeline>>, notifier: Arc<NotifierRegistry>) -> Self {
        Self {
            pipelines,
            notifier,
        }
    }

    #[must_use]
    pub fn pipelines(&self) -> &[Arc<AccountPipeline>] {
        &self.pipelines
    }

    #[must_use]
    pub fn pipeline(&self, account_id: &AccountId) -> Option<&Arc<AccountPipeline>> {
        self.pipelines.iter().find(|p| p.account_id() == account_id)
    }

    /// Run one cycle for every account concurrently.
    ///
    /// Each account reconciles its stale PENDING intents inside its own task
    /// before cycling, so a slow broker only delays its own account.
    pub async fn run_once(&self) -> Vec<AccountOutcome> {
        let cycles = self.pipelines.iter().map(|pipeline| {
            let pipeline = Arc::clone(pipeline);
            let account_id = pipeline.account_id().clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = pipeline.reconcile().await {
                    warn!(account = %pipeline.account_id(), error = %e, "Reconciliation failed");
                }
                pipeline.run_cycle().await
            });
            async move { (account_id, handle.await) }
        });
        let joined = futures_util::future::join_all(cycles).await;

        let mut outcomes = Vec::with_capacity(joined.len());
        for (account_id, joined_result) in joined {
            let result = match joined_result {
                Ok(Ok(report)) => Ok(report),
                Ok(Err(e)) => Err(e.to_string()),
                Err(join_error) if join_error.is_panic() => Err("account pipeline panicked".to_string()),
                Err(join_error) => Err(join_error.to_string()),
            };
            if let Err(reason) = &result {
                error!(account = %account_id, error = %reason, "Account cycle failed");
                self.notifier.notify_all(Event::CycleFailed {
                    account_id: account_id.clone(),
                    error: reason.clone(),
                });
            }
            outcomes.push(AccountOutcome { account_id, result });
        }
        outcomes
    }

    /// Reconcile stale PENDING intents for every account concurrently.
    pub async fn reconcile_all(&self) -> Vec<(AccountId, Result<ReconcileReport, String>)> {
        let passes = self.pipelines.iter().map(|pipeline| async move {
            let result = pipeline.reconcile().await.map_err(|e| e.to_string());
            if let Err(e) = &result {
                warn!(account = %pipeline.account_id(), error = %e, "Reconciliation failed");
            }
            (pipeline.account_id().clone(), result)
        });
        futures_util::future::join_all(passes).await
    }

    /// Cycle every `interval` until `shutdown` resolves.
    ///
    /// Pending intents are reconciled at the start of each account's cycle.
    pub async fn run<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            accounts = self.pipelines.len(),
            interval_secs = interval.as_secs(),
            "Supervisor started"
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, supervisor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let outcomes = self.run_once().await;
                    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
                    info!(accounts = outcomes.len(), failed, "Supervisor cycle finished");
                }
            }
        }
    }
}
