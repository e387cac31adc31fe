//! Actions: trigger-activated mutations of the backtest ledger.
//!
//! Every action implements [`Action::apply`]. There is no base implementation:
//! an action type that does not know how to apply itself does not compile.
//!
//! # Ordering
//! Actions that read ledger results (hedges) must be applied after every
//! action that writes those results. The core does not check this; drivers
//! schedule accordingly and a premature read fails with
//! [`ActionError::MissingExposure`].

pub mod add_trade;
pub mod hedge;

pub use add_trade::AddTradeAction;
pub use hedge::{HedgeAction, SizedHedge};

use crate::domain::RiskMeasure;
use crate::error::ActionError;
use crate::ledger::BacktestLedger;
use crate::oracle::PricingOracle;
use chrono::NaiveDate;
use std::fmt;

/// The date(s) at which an action fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerState {
    Single(NaiveDate),
    Many(Vec<NaiveDate>),
}

impl TriggerState {
    pub fn dates(&self) -> &[NaiveDate] {
        match self {
            TriggerState::Single(date) => std::slice::from_ref(date),
            TriggerState::Many(dates) => dates,
        }
    }

    /// The one trigger date, if there is exactly one.
    pub fn single(&self) -> Option<NaiveDate> {
        match self.dates() {
            [date] => Some(*date),
            _ => None,
        }
    }
}

impl From<NaiveDate> for TriggerState {
    fn from(date: NaiveDate) -> Self {
        TriggerState::Single(date)
    }
}

impl From<Vec<NaiveDate>> for TriggerState {
    fn from(dates: Vec<NaiveDate>) -> Self {
        TriggerState::Many(dates)
    }
}

impl From<&[NaiveDate]> for TriggerState {
    fn from(dates: &[NaiveDate]) -> Self {
        TriggerState::Many(dates.to_vec())
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Single(date) => write!(f, "{date}"),
            TriggerState::Many(dates) => match (dates.first(), dates.last()) {
                (Some(first), Some(last)) if dates.len() > 1 => {
                    write!(f, "{first}..{last} ({} dates)", dates.len())
                }
                (Some(first), _) => write!(f, "{first}"),
                _ => write!(f, "<no dates>"),
            },
        }
    }
}

/// A discrete, trigger-activated mutation of the ledger.
pub trait Action: Send + Sync + fmt::Debug {
    /// Unique action name. Owned instruments embed it.
    fn name(&self) -> &str;

    /// False when the outcome depends on values measured during the run.
    fn deterministic(&self) -> bool {
        true
    }

    /// Risk measure this action depends on, if any.
    fn risk(&self) -> Option<&RiskMeasure> {
        None
    }

    /// Apply the action at `trigger`, mutating `ledger` in place.
    ///
    /// Returns the same ledger so drivers can chain applications.
    fn apply<'l>(
        &self,
        trigger: &TriggerState,
        ledger: &'l mut BacktestLedger,
        oracle: &dyn PricingOracle,
    ) -> Result<&'l mut BacktestLedger, ActionError>;
}
