//! Backtest ledger: the mutable state shared by all actions in one run.
//!
//! Mutation rights:
//! - positions are append-only: each action invocation appends one batch per date
//! - results are merged additively: several actions may contribute to a date/measure
//! - counters only increase
//!
//! Nothing is ever removed, so a failed run leaves whatever was written before
//! the failure. Drivers must discard the ledger of a failed run.

use crate::domain::{LedgerFingerprint, Priceable, RiskMeasure, RiskResult, RiskResults};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct BacktestLedger {
    states: Vec<NaiveDate>,
    risks: Vec<RiskMeasure>,
    portfolio_dict: BTreeMap<NaiveDate, Vec<Vec<Priceable>>>,
    results: BTreeMap<NaiveDate, RiskResults>,
    calc_calls: usize,
    calculations: usize,
}

/// Canonical view hashed by [`BacktestLedger::fingerprint`].
#[derive(Serialize)]
struct FingerprintView<'a> {
    portfolio_dict: &'a BTreeMap<NaiveDate, Vec<Vec<Priceable>>>,
    results: &'a BTreeMap<NaiveDate, RiskResults>,
}

impl BacktestLedger {
    /// Create an empty ledger. States are sorted and deduplicated; every state
    /// starts with no position batches.
    pub fn new(
        states: impl IntoIterator<Item = NaiveDate>,
        risks: impl IntoIterator<Item = RiskMeasure>,
    ) -> Self {
        let mut states: Vec<NaiveDate> = states.into_iter().collect();
        states.sort();
        states.dedup();
        let mut risks: Vec<RiskMeasure> = risks.into_iter().collect();
        risks.sort();
        risks.dedup();
        let portfolio_dict = states.iter().map(|s| (*s, Vec::new())).collect();
        Self {
            states,
            risks,
            portfolio_dict,
            results: BTreeMap::new(),
            calc_calls: 0,
            calculations: 0,
        }
    }

    pub fn states(&self) -> &[NaiveDate] {
        &self.states
    }

    pub fn risks(&self) -> &[RiskMeasure] {
        &self.risks
    }

    pub fn contains_state(&self, date: NaiveDate) -> bool {
        self.states.binary_search(&date).is_ok()
    }

    /// Ledger states in the inclusive range `[from, to]`.
    pub fn states_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        self.states.iter().copied().filter(|s| from <= *s && *s <= to).collect()
    }

    pub fn portfolio_dict(&self) -> &BTreeMap<NaiveDate, Vec<Vec<Priceable>>> {
        &self.portfolio_dict
    }

    /// Position batches appended on `date`, in append order.
    pub fn batches(&self, date: NaiveDate) -> &[Vec<Priceable>] {
        self.portfolio_dict.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every position active on `date`, across batches.
    pub fn positions(&self, date: NaiveDate) -> impl Iterator<Item = &Priceable> {
        self.batches(date).iter().flatten()
    }

    /// Whether an instrument with this name is active on `date`.
    pub fn holds(&self, date: NaiveDate, name: &str) -> bool {
        self.positions(date).any(|p| p.name.as_deref() == Some(name))
    }

    pub fn append_batch(&mut self, date: NaiveDate, batch: Vec<Priceable>) {
        self.portfolio_dict.entry(date).or_default().push(batch);
    }

    pub fn results(&self) -> &BTreeMap<NaiveDate, RiskResults> {
        &self.results
    }

    pub fn result(&self, date: NaiveDate, risk: &RiskMeasure) -> Option<&RiskResult> {
        self.results.get(&date).and_then(|r| r.get(risk))
    }

    /// Aggregated exposure already measured for `date`/`risk`, if any.
    pub fn exposure(&self, date: NaiveDate, risk: &RiskMeasure) -> Option<f64> {
        self.result(date, risk).map(RiskResult::aggregate)
    }

    /// Merge `results` into the results already held for `date`.
    pub fn add_results(&mut self, date: NaiveDate, results: RiskResults) {
        let slot = self.results.entry(date).or_default();
        for (risk, result) in results {
            slot.entry(risk).or_default().merge(result);
        }
    }

    /// Account for one oracle calculation over `dates` dates and every tracked risk.
    pub fn record_calc(&mut self, dates: usize) {
        self.calc_calls += 1;
        self.calculations += dates * self.risks.len();
    }

    pub fn calc_calls(&self) -> usize {
        self.calc_calls
    }

    pub fn calculations(&self) -> usize {
        self.calculations
    }

    /// Content hash of positions and results. Counters are excluded so that
    /// batching strategies producing the same state hash identically.
    ///
    /// Fails only if the canonical JSON encoding fails.
    pub fn fingerprint(&self) -> Result<LedgerFingerprint, serde_json::Error> {
        let view = FingerprintView { portfolio_dict: &self.portfolio_dict, results: &self.results };
        let canonical = serde_json::to_vec(&view)?;
        Ok(LedgerFingerprint::from_bytes(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ledger() -> BacktestLedger {
        BacktestLedger::new(
            [d(2024, 1, 4), d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 2)],
            [RiskMeasure::from("delta"), RiskMeasure::from("vega")],
        )
    }

    #[test]
    fn states_sorted_and_deduplicated() {
        let l = ledger();
        assert_eq!(l.states(), &[d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
        assert!(l.batches(d(2024, 1, 3)).is_empty());
        assert_eq!(l.portfolio_dict().len(), 3);
    }

    #[test]
    fn batches_append() {
        let mut l = ledger();
        l.append_batch(d(2024, 1, 2), vec![Priceable::new("swap", 1.0).with_name("a")]);
        l.append_batch(d(2024, 1, 2), vec![]);
        l.append_batch(d(2024, 1, 2), vec![Priceable::new("swap", 1.0).with_name("b")]);
        assert_eq!(l.batches(d(2024, 1, 2)).len(), 3);
        assert_eq!(l.positions(d(2024, 1, 2)).count(), 2);
        assert!(l.holds(d(2024, 1, 2), "b"));
        assert!(!l.holds(d(2024, 1, 3), "b"));
    }

    #[test]
    fn add_results_merges() {
        let mut l = ledger();
        let delta = RiskMeasure::from("delta");
        let mut first = RiskResults::new();
        first.insert(delta.clone(), RiskResult::single("a", 100.0));
        l.add_results(d(2024, 1, 2), first);
        let mut second = RiskResults::new();
        second.insert(delta.clone(), RiskResult::single("hedge", -100.0));
        l.add_results(d(2024, 1, 2), second);

        assert_eq!(l.exposure(d(2024, 1, 2), &delta), Some(0.0));
        assert_eq!(l.result(d(2024, 1, 2), &delta).unwrap().len(), 2);
        assert_eq!(l.exposure(d(2024, 1, 3), &delta), None);
    }

    #[test]
    fn record_calc_counts_cells() {
        let mut l = ledger();
        l.record_calc(3);
        l.record_calc(0);
        assert_eq!(l.calc_calls(), 2);
        assert_eq!(l.calculations(), 6);
    }

    #[test]
    fn states_between_inclusive() {
        let l = ledger();
        assert_eq!(
            l.states_between(d(2024, 1, 3), d(2024, 1, 9)),
            vec![d(2024, 1, 3), d(2024, 1, 4)]
        );
        assert!(l.contains_state(d(2024, 1, 4)));
        assert!(!l.contains_state(d(2024, 1, 5)));
    }

    #[test]
    fn fingerprint_tracks_content_not_counters() {
        let mut a = ledger();
        let mut b = ledger();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        a.record_calc(2);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.append_batch(d(2024, 1, 2), vec![Priceable::new("swap", 1.0)]);
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
