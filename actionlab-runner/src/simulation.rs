//! Simulation driver: applies scheduled actions to a ledger in causal order.
//!
//! A run has three phases:
//! 1. deterministic actions (add-trade), each applied once with all of its
//!    trigger dates batched, in configuration order;
//! 2. a portfolio risk pass measuring every tracked risk of the positions live
//!    on each ledger date;
//! 3. non-deterministic actions (hedges), one application per trigger date,
//!    ordered by trigger date and then by configuration order.
//!
//! Hedges therefore always read exposure produced by phase 2. Any failure
//! aborts the run; a failed run never hands back its ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use actionlab_core::domain::{LedgerFingerprint, RiskResult, RiskResults};
use actionlab_core::oracle::{CalcRequest, OracleError};
use actionlab_core::{ActionError, BacktestLedger, NameSequence, PricingOracle, TriggerState};

use crate::config::{ConfigError, ScheduledAction, SimulationConfig};

/// Errors from a simulation run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("action '{action}' failed at {trigger}: {source}")]
    ActionFailed {
        action: String,
        trigger: String,
        #[source]
        source: ActionError,
    },
    #[error("portfolio risk pass failed on {date}: {source}")]
    Measurement {
        date: NaiveDate,
        #[source]
        source: OracleError,
    },
    #[error("fingerprint ledger: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted run reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a simulation run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub fingerprint: LedgerFingerprint,
    pub action_count: usize,
    pub calc_calls: usize,
    pub calculations: usize,
    pub ledger: BacktestLedger,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A ledger plus the actions scheduled against it.
#[derive(Debug)]
pub struct Simulation {
    name: String,
    ledger: BacktestLedger,
    actions: Vec<ScheduledAction>,
}

impl Simulation {
    pub fn new(name: impl Into<String>, ledger: BacktestLedger) -> Self {
        Self { name: name.into(), ledger, actions: Vec::new() }
    }

    /// Build a simulation from configuration, naming unnamed actions from `names`.
    pub fn from_config(
        config: &SimulationConfig,
        names: &mut NameSequence,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let mut simulation = Self::new(config.name.clone(), config.ledger());
        for scheduled in config.build(names)? {
            simulation.schedule(scheduled);
        }
        Ok(simulation)
    }

    pub fn schedule(&mut self, scheduled: ScheduledAction) {
        self.actions.push(scheduled);
    }

    pub fn ledger(&self) -> &BacktestLedger {
        &self.ledger
    }

    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    /// Run every phase against `oracle` and report the final ledger.
    pub fn run(mut self, oracle: &dyn PricingOracle) -> Result<RunReport, RunError> {
        info!(
            simulation = %self.name,
            oracle = oracle.name(),
            actions = self.actions.len(),
            "starting run"
        );

        for scheduled in self.actions.iter().filter(|s| s.action.deterministic()) {
            let trigger = TriggerState::Many(scheduled.triggers.clone());
            apply_scheduled(scheduled, &trigger, &mut self.ledger, oracle)?;
        }

        measure_portfolio(&mut self.ledger, oracle)?;

        let mut hedges: Vec<(NaiveDate, &ScheduledAction)> = self
            .actions
            .iter()
            .filter(|s| !s.action.deterministic())
            .flat_map(|s| s.triggers.iter().map(move |t| (*t, s)))
            .collect();
        hedges.sort_by_key(|(trigger, _)| *trigger);
        for (date, scheduled) in hedges {
            apply_scheduled(scheduled, &TriggerState::Single(date), &mut self.ledger, oracle)?;
        }

        let fingerprint = self.ledger.fingerprint()?;
        info!(
            simulation = %self.name,
            calc_calls = self.ledger.calc_calls(),
            calculations = self.ledger.calculations(),
            fingerprint = %fingerprint,
            "run complete"
        );
        Ok(RunReport {
            schema_version: SCHEMA_VERSION,
            name: self.name,
            fingerprint,
            action_count: self.actions.len(),
            calc_calls: self.ledger.calc_calls(),
            calculations: self.ledger.calculations(),
            ledger: self.ledger,
        })
    }
}

fn apply_scheduled(
    scheduled: &ScheduledAction,
    trigger: &TriggerState,
    ledger: &mut BacktestLedger,
    oracle: &dyn PricingOracle,
) -> Result<(), RunError> {
    let name = scheduled.action.name();
    match scheduled.action.apply(trigger, ledger, oracle) {
        Ok(_) => {
            info!(action = name, trigger = %trigger, "applied");
            Ok(())
        }
        Err(source) => {
            warn!(action = name, trigger = %trigger, error = %source, "action failed");
            Err(RunError::ActionFailed {
                action: name.to_string(),
                trigger: trigger.to_string(),
                source,
            })
        }
    }
}

/// Measure every tracked risk of the positions live on each ledger date.
///
/// Dates without positions get an empty result per risk, so a later hedge
/// reads an exposure of zero rather than a missing one.
pub fn measure_portfolio(
    ledger: &mut BacktestLedger,
    oracle: &dyn PricingOracle,
) -> Result<(), RunError> {
    let risks = ledger.risks().to_vec();
    for date in ledger.states().to_vec() {
        let instruments: Vec<_> = ledger.positions(date).cloned().collect();
        let results = if instruments.is_empty() {
            risks.iter().map(|r| (r.clone(), RiskResult::new())).collect::<RiskResults>()
        } else {
            let request = CalcRequest { instruments, risks: risks.clone(), dates: vec![date] };
            ledger.record_calc(1);
            let mut computed =
                oracle.calc(&request).map_err(|source| RunError::Measurement { date, source })?;
            computed.remove(&date).ok_or_else(|| RunError::Measurement {
                date,
                source: OracleError::MissingResult { date },
            })?
        };
        ledger.add_results(date, results);
    }
    Ok(())
}
