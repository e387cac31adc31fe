//! Resolution batching across trigger dates.
//!
//! Callers register the instruments they need resolved at each date, then
//! `submit` issues a single oracle request and hands results back keyed by
//! date. Submitting consumes the builder, so a batch is sent at most once and
//! an abandoned batch simply never reaches the oracle.

use super::{OracleError, PricingOracle, ResolveRequest};
use crate::domain::Priceable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
#[must_use = "a resolution batch does nothing until submitted"]
pub struct ResolutionBatch {
    pending: BTreeMap<NaiveDate, Vec<Priceable>>,
}

impl ResolutionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the instruments to resolve as of `as_of`.
    ///
    /// Registering the same date twice replaces the earlier set.
    pub fn register(&mut self, as_of: NaiveDate, instruments: &[Priceable]) {
        self.pending.insert(as_of, instruments.to_vec());
    }

    /// Number of distinct dates registered.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total instruments across all dates.
    pub fn request_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Send everything in one oracle call.
    ///
    /// An empty batch returns without contacting the oracle. Any failure fails
    /// every date in the batch.
    pub fn submit(self, oracle: &dyn PricingOracle) -> Result<ResolvedBatch, OracleError> {
        if self.is_empty() {
            return Ok(ResolvedBatch::default());
        }

        let mut counts = Vec::with_capacity(self.pending.len());
        let mut requests = Vec::with_capacity(self.request_count());
        for (as_of, instruments) in self.pending {
            counts.push((as_of, instruments.len()));
            requests.extend(
                instruments.into_iter().map(|instrument| ResolveRequest { as_of, instrument }),
            );
        }

        let resolved = oracle.resolve(&requests)?;
        if resolved.len() != requests.len() {
            return Err(OracleError::ShapeMismatch {
                expected: requests.len(),
                actual: resolved.len(),
            });
        }

        let mut by_date = BTreeMap::new();
        let mut remaining = resolved.into_iter();
        for (as_of, count) in counts {
            by_date.insert(as_of, remaining.by_ref().take(count).collect());
        }
        Ok(ResolvedBatch { by_date })
    }
}

/// Resolved instruments keyed by the date they were resolved at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedBatch {
    by_date: BTreeMap<NaiveDate, Vec<Priceable>>,
}

impl ResolvedBatch {
    pub fn get(&self, as_of: NaiveDate) -> Option<&[Priceable]> {
        self.by_date.get(&as_of).map(Vec::as_slice)
    }

    /// Iterate `(creation date, instrument)` pairs in date order.
    pub fn instruments(&self) -> impl Iterator<Item = (NaiveDate, &Priceable)> {
        self.by_date.iter().flat_map(|(d, items)| items.iter().map(move |i| (*d, i)))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
