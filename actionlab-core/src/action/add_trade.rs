//! Add-trade action: inserts instruments that stay live over a lifecycle window.
//!
//! On each trigger (creation) date the action resolves its instrument set as
//! of that date. All trigger dates go to the oracle in one batch. Each
//! resolved instrument is then placed on every ledger date inside
//! `[creation date, final date]`.

use super::{Action, TriggerState};
use crate::domain::{adopt_all, Priceable};
use crate::duration::{final_date, is_active, TradeDuration};
use crate::error::ActionError;
use crate::ledger::BacktestLedger;
use crate::naming::NameSequence;
use crate::oracle::{PricingOracle, ResolutionBatch};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct AddTradeAction {
    name: String,
    priceables: Vec<Priceable>,
    dated_priceables: BTreeMap<NaiveDate, Vec<Priceable>>,
    trade_duration: TradeDuration,
}

impl AddTradeAction {
    /// Create with a generated name drawn from `names`.
    pub fn new(
        names: &mut NameSequence,
        priceables: impl IntoIterator<Item = Priceable>,
        trade_duration: TradeDuration,
    ) -> Self {
        Self::with_name(names.next_name(), priceables, trade_duration)
    }

    pub fn with_name(
        name: impl Into<String>,
        priceables: impl IntoIterator<Item = Priceable>,
        trade_duration: TradeDuration,
    ) -> Self {
        let name = name.into();
        let priceables = adopt_all(&name, priceables);
        Self { name, priceables, dated_priceables: BTreeMap::new(), trade_duration }
    }

    /// Replace the default set on `date` with `priceables`.
    ///
    /// The override is used exclusively on that date. An empty override falls
    /// back to the default set.
    pub fn with_dated_priceables(
        mut self,
        date: NaiveDate,
        priceables: impl IntoIterator<Item = Priceable>,
    ) -> Self {
        let adopted = adopt_all(&self.name, priceables);
        self.dated_priceables.insert(date, adopted);
        self
    }

    pub fn priceables(&self) -> &[Priceable] {
        &self.priceables
    }

    pub fn dated_priceables(&self) -> &BTreeMap<NaiveDate, Vec<Priceable>> {
        &self.dated_priceables
    }

    pub fn trade_duration(&self) -> &TradeDuration {
        &self.trade_duration
    }

    /// Instruments to create on `date`: the dated override when present and
    /// non-empty, else the default set.
    pub fn override_or_default(&self, date: NaiveDate) -> &[Priceable] {
        self.dated_priceables
            .get(&date)
            .filter(|overrides| !overrides.is_empty())
            .map_or(self.priceables.as_slice(), Vec::as_slice)
    }
}

impl Action for AddTradeAction {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip_all, fields(action = %self.name, trigger = %trigger))]
    fn apply<'l>(
        &self,
        trigger: &TriggerState,
        ledger: &'l mut BacktestLedger,
        oracle: &dyn PricingOracle,
    ) -> Result<&'l mut BacktestLedger, ActionError> {
        let mut batch = ResolutionBatch::new();
        for date in trigger.dates() {
            batch.register(*date, self.override_or_default(*date));
        }
        debug!(dates = batch.len(), instruments = batch.request_count(), "resolving");
        let resolved = batch.submit(oracle).map_err(ActionError::resolution)?;

        // Windows are computed up front so a duration failure writes nothing.
        let mut windows = Vec::new();
        for (created, instrument) in resolved.instruments() {
            let calendar = oracle.calendar(instrument);
            let end = final_date(instrument, created, &self.trade_duration, calendar)?;
            windows.push((created, end, instrument));
        }

        let batches: Vec<(NaiveDate, Vec<Priceable>)> = ledger
            .states()
            .iter()
            .map(|&state| {
                let live = windows
                    .iter()
                    .filter(|(created, end, _)| is_active(state, *created, *end))
                    .map(|(_, _, instrument)| (*instrument).clone())
                    .collect();
                (state, live)
            })
            .collect();

        for (state, live) in batches {
            ledger.append_batch(state, live);
        }
        debug!(positions = windows.len(), "appended");
        Ok(ledger)
    }
}
