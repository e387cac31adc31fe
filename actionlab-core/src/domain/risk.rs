//! Risk results: per-instrument values for one date and one risk measure.

use super::ids::RiskMeasure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values of one risk measure for a set of instruments at one date.
///
/// Keyed by instrument label. Inserting a label twice accumulates, so two
/// positions sharing a name still both count toward the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    values: BTreeMap<String, f64>,
}

impl RiskResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(instrument: impl Into<String>, value: f64) -> Self {
        let mut result = Self::new();
        result.add(instrument, value);
        result
    }

    pub fn add(&mut self, instrument: impl Into<String>, value: f64) {
        *self.values.entry(instrument.into()).or_insert(0.0) += value;
    }

    /// Merge another result into this one, summing shared instruments.
    pub fn merge(&mut self, other: RiskResult) {
        for (instrument, value) in other.values {
            self.add(instrument, value);
        }
    }

    /// Reduce to a single scalar (sum across instruments).
    pub fn aggregate(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.values.get(instrument).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// All measured risks for one date.
pub type RiskResults = BTreeMap<RiskMeasure, RiskResult>;

/// Risk results across dates, as returned by a batched calculation.
pub type DatedResults = BTreeMap<NaiveDate, RiskResults>;
