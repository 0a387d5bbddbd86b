//! Decision module with scripted behavior.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::strategy::{DecisionModule, EvaluationContext};
use crate::domain::{Action, AssetClass, ModuleId, StrategySignal, Symbol};
use crate::error::{Error, Result};

/// What a [`ScriptedModule`] does when evaluated.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Emit this action with confidence and target allocation.
    Signal {
        action: Action,
        confidence: f64,
        allocation: Decimal,
    },
    /// Return an error.
    Fail(String),
    /// Sleep, then HOLD. Used to trip the module timeout.
    Sleep(Duration),
    /// Panic inside the evaluation task.
    Panic,
}

/// A module whose output is fixed at construction.
pub struct ScriptedModule {
    id: ModuleId,
    symbol: Symbol,
    behavior: Behavior,
}

impl ScriptedModule {
    pub fn new(id: &str, symbol: &str, behavior: Behavior) -> Self {
        Self {
            id: ModuleId::from(id),
            symbol: Symbol::from(symbol),
            behavior,
        }
    }

    /// Module that always emits `action`.
    pub fn emitting(id: &str, symbol: &str, action: Action, confidence: f64, allocation: Decimal) -> Self {
        Self::new(
            id,
            symbol,
            Behavior::Signal {
                action,
                confidence,
                allocation,
            },
        )
    }
}

#[async_trait]
impl DecisionModule for ScriptedModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<StrategySignal> {
        let asset_class = ctx.market.asset_class(&self.symbol);
        match &self.behavior {
            Behavior::Signal {
                action,
                confidence,
                allocation,
            } => Ok(StrategySignal::new(
                self.id.clone(),
                *action,
                self.symbol.clone(),
                *confidence,
                *allocation,
                "scripted",
                asset_class,
            )),
            Behavior::Fail(reason) => Err(Error::Module(reason.clone())),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(StrategySignal::new(
                    self.id.clone(),
                    Action::Hold,
                    self.symbol.clone(),
                    0.0,
                    Decimal::ZERO,
                    "slept",
                    AssetClass::default(),
                ))
            }
            Behavior::Panic => panic!("scripted module {} panicked", self.id),
        }
    }
}
