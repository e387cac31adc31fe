//! Hedge action: sizes an offsetting position from measured exposure.
//!
//! At a single trigger date the template is resolved and its unit exposure
//! measured; the ledger's aggregated exposure for the same date and measure
//! divided by the unit exposure gives the hedge ratio. The scaled hedge then
//! has every tracked risk recomputed over its active window in one batched
//! request, and the results are merged into the ledger.
//!
//! Not deterministic: the notional depends on what the run measured earlier.

use super::{Action, TriggerState};
use crate::domain::{DatedResults, Priceable, RiskMeasure, RiskResult};
use crate::duration::{final_date, TradeDuration};
use crate::error::ActionError;
use crate::ledger::BacktestLedger;
use crate::naming::NameSequence;
use crate::oracle::{resolve_one, CalcRequest, OracleError, PricingOracle};
use chrono::NaiveDate;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HedgeAction {
    name: String,
    risk: RiskMeasure,
    priceable: Priceable,
    trade_duration: TradeDuration,
    risks_on_final_day: bool,
}

/// A hedge sized at one trigger date, before any ledger write.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedHedge {
    pub trigger: NaiveDate,
    pub instrument: Priceable,
    pub ratio: f64,
    pub unit_exposure: f64,
    pub ledger_exposure: f64,
}

/// `ledger_exposure / unit_exposure`, or `None` when that is undefined.
///
/// A zero ledger exposure is a valid ratio of zero; a zero or non-finite unit
/// exposure is not.
pub fn hedge_ratio(ledger_exposure: f64, unit_exposure: f64) -> Option<f64> {
    if unit_exposure == 0.0 || !unit_exposure.is_finite() {
        return None;
    }
    let ratio = ledger_exposure / unit_exposure;
    ratio.is_finite().then_some(ratio)
}

impl HedgeAction {
    pub fn new(
        names: &mut NameSequence,
        risk: impl Into<RiskMeasure>,
        priceable: Priceable,
        trade_duration: TradeDuration,
        risks_on_final_day: bool,
    ) -> Self {
        Self::with_name(names.next_name(), risk, priceable, trade_duration, risks_on_final_day)
    }

    pub fn with_name(
        name: impl Into<String>,
        risk: impl Into<RiskMeasure>,
        mut priceable: Priceable,
        trade_duration: TradeDuration,
        risks_on_final_day: bool,
    ) -> Self {
        let name = name.into();
        priceable.adopt(&name, 0);
        Self { name, risk: risk.into(), priceable, trade_duration, risks_on_final_day }
    }

    pub fn priceable(&self) -> &Priceable {
        &self.priceable
    }

    pub fn trade_duration(&self) -> &TradeDuration {
        &self.trade_duration
    }

    /// Whether the final day was requested explicitly. The active window
    /// includes it either way.
    pub fn risks_on_final_day(&self) -> bool {
        self.risks_on_final_day
    }

    /// Resolve, measure and scale the template at `trigger`.
    ///
    /// Reads the ledger but never writes it.
    pub fn size(
        &self,
        trigger: NaiveDate,
        ledger: &BacktestLedger,
        oracle: &dyn PricingOracle,
    ) -> Result<SizedHedge, ActionError> {
        let template =
            resolve_one(oracle, &self.priceable, trigger).map_err(ActionError::resolution)?;

        let unit_request = CalcRequest {
            instruments: vec![template.clone()],
            risks: vec![self.risk.clone()],
            dates: vec![trigger],
        };
        let unit_exposure = oracle
            .calc(&unit_request)
            .map_err(ActionError::calculation)?
            .get(&trigger)
            .and_then(|results| results.get(&self.risk))
            .map(RiskResult::aggregate)
            .ok_or_else(|| ActionError::calculation(OracleError::MissingResult { date: trigger }))?;

        let ledger_exposure = ledger.exposure(trigger, &self.risk).ok_or_else(|| {
            ActionError::MissingExposure { date: trigger, risk: self.risk.clone() }
        })?;

        let ratio = hedge_ratio(ledger_exposure, unit_exposure).ok_or_else(|| {
            ActionError::DegenerateHedgeRatio {
                date: trigger,
                risk: self.risk.clone(),
                unit_exposure,
            }
        })?;

        Ok(SizedHedge {
            trigger,
            instrument: template.scale(ratio),
            ratio,
            unit_exposure,
            ledger_exposure,
        })
    }

    /// Ledger states in `[trigger, final_date]`, the same inclusive window
    /// an add-trade position is live on.
    pub fn active_dates(
        &self,
        ledger: &BacktestLedger,
        trigger: NaiveDate,
        final_date: NaiveDate,
    ) -> Vec<NaiveDate> {
        ledger.states().iter().copied().filter(|s| (trigger..=final_date).contains(s)).collect()
    }
}

impl Action for HedgeAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn deterministic(&self) -> bool {
        false
    }

    fn risk(&self) -> Option<&RiskMeasure> {
        Some(&self.risk)
    }

    #[instrument(level = "debug", skip_all, fields(action = %self.name, trigger = %trigger))]
    fn apply<'l>(
        &self,
        trigger: &TriggerState,
        ledger: &'l mut BacktestLedger,
        oracle: &dyn PricingOracle,
    ) -> Result<&'l mut BacktestLedger, ActionError> {
        let state = trigger.single().ok_or_else(|| {
            ActionError::Configuration(format!(
                "hedge action '{}' fires on exactly one date, got {}",
                self.name,
                trigger.dates().len()
            ))
        })?;

        let sized = self.size(state, ledger, oracle)?;
        debug!(
            ratio = sized.ratio,
            unit = sized.unit_exposure,
            exposure = sized.ledger_exposure,
            "sized hedge"
        );

        let calendar = oracle.calendar(&sized.instrument);
        let end = final_date(&sized.instrument, state, &self.trade_duration, calendar)?;
        let active = self.active_dates(ledger, state, end);

        let request = CalcRequest {
            instruments: vec![sized.instrument],
            risks: ledger.risks().to_vec(),
            dates: active,
        };
        ledger.record_calc(request.dates.len());
        let mut computed: DatedResults = oracle.calc(&request).map_err(ActionError::calculation)?;

        // Every active date must be answered before anything is written.
        let mut writes = Vec::with_capacity(request.dates.len());
        for date in &request.dates {
            let results = computed.remove(date).ok_or_else(|| {
                ActionError::calculation(OracleError::MissingResult { date: *date })
            })?;
            writes.push((*date, results));
        }
        for (date, results) in writes {
            ledger.add_results(date, results);
        }
        debug!(dates = request.dates.len(), "hedge risk recorded");
        Ok(ledger)
    }
}
