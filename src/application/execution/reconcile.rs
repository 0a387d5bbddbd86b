//! Crash recovery for intents whose broker outcome is unknown.

use chrono::Utc;
use tracing::{info, warn};

use super::ExecutionRouter;
use crate::domain::{IntentState, LedgerStatus, LedgerUpdate};
use crate::error::Result;

/// Outcome of [`ExecutionRouter::reconcile_pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stale PENDING entries looked up at the broker.
    pub examined: usize,
    /// Found at the broker and marked SUBMITTED.
    pub submitted: usize,
    /// Unknown to the broker and marked FAILED.
    pub failed: usize,
    /// Left PENDING because the broker could not be asked.
    pub unresolved: usize,
}

impl ExecutionRouter {
    /// Resolve PENDING ledger entries older than the pending timeout.
    ///
    /// Each entry is looked up at the broker by its intent id. Found entries
    /// become SUBMITTED, missing ones FAILED. Nothing is ever resubmitted.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot be read.
    pub async fn reconcile_pending(&self) -> Result<ReconcileReport> {
        let cutoff = Utc::now() - self.settings().pending_timeout;
        let pending = self.ledger().by_status(LedgerStatus::Pending).await?;
        let mut report = ReconcileReport::default();

        for entry in pending
            .into_iter()
            .filter(|e| &e.account_id == self.account_id() && e.created_at <= cutoff)
        {
            report.examined += 1;
            let lookup = tokio::time::timeout(
                self.settings().broker_timeout,
                self.broker().find_order(&entry.intent_id),
            )
            .await;

            let update = match lookup {
                Ok(Ok(Some(order))) => {
                    let intent_state = order.status.intent_state();
                    let status = if intent_state == IntentState::Rejected {
                        report.failed += 1;
                        LedgerStatus::Failed
                    } else {
                        report.submitted += 1;
                        LedgerStatus::Submitted
                    };
                    LedgerUpdate {
                        status,
                        intent_state,
                        broker_order_id: Some(order.broker_order_id.clone()),
                        response: serde_json::to_string(&order).ok(),
                        note: Some("reconciled: found at broker".into()),
                    }
                }
                Ok(Ok(None)) => {
                    report.failed += 1;
                    LedgerUpdate {
                        status: LedgerStatus::Failed,
                        intent_state: IntentState::Rejected,
                        broker_order_id: None,
                        response: None,
                        note: Some("reconciled: not found at broker".into()),
                    }
                }
                Ok(Err(e)) => {
                    report.unresolved += 1;
                    warn!(account = %self.account_id(), intent = %entry.intent_id, error = %e, "Reconciliation lookup failed");
                    continue;
                }
                Err(_) => {
                    report.unresolved += 1;
                    warn!(account = %self.account_id(), intent = %entry.intent_id, "Reconciliation lookup timed out");
                    continue;
                }
            };

            self.ledger().merge(&entry.intent_id, &update).await?;
            info!(
                account = %self.account_id(),
                intent = %entry.intent_id,
                status = %update.status,
                "Pending intent reconciled"
            );
        }

        Ok(report)
    }
}
