//! Oracle contract: the external resolution and risk-calculation service.
//!
//! The core treats pricing as opaque: it sends instruments and dates and gets
//! resolved instruments or numeric risk back. Requests are batched across
//! dates to amortize round-trip cost.

pub mod batch;
pub mod table;

pub use batch::{ResolutionBatch, ResolvedBatch};
pub use table::TableOracle;

use crate::calendar::{BusinessCalendar, WeekendCalendar};
use crate::domain::{DatedResults, Priceable, RiskMeasure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolve one instrument as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub as_of: NaiveDate,
    pub instrument: Priceable,
}

/// Compute `risks` for the combined `instruments` on every date in `dates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcRequest {
    pub instruments: Vec<Priceable>,
    pub risks: Vec<RiskMeasure>,
    pub dates: Vec<NaiveDate>,
}

impl CalcRequest {
    /// Number of (date, risk) cells this request asks for.
    pub fn calculations(&self) -> usize {
        self.dates.len() * self.risks.len()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    #[error("cannot resolve '{instrument}' as of {as_of}: {reason}")]
    Unresolvable { instrument: String, as_of: NaiveDate, reason: String },

    #[error("calculation failed: {0}")]
    CalculationFailed(String),

    #[error("oracle returned {actual} items for {expected} requests")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("oracle returned no result for {date}")]
    MissingResult { date: NaiveDate },
}

/// Resolution and risk service consumed by actions.
pub trait PricingOracle: Send + Sync {
    /// Human-readable name of this oracle.
    fn name(&self) -> &str;

    /// Resolve every request in one round trip.
    ///
    /// Must return exactly one instrument per request, in request order.
    fn resolve(&self, requests: &[ResolveRequest]) -> Result<Vec<Priceable>, OracleError>;

    /// Compute risks across all requested dates in one round trip.
    fn calc(&self, request: &CalcRequest) -> Result<DatedResults, OracleError>;

    /// Calendar used for tenor arithmetic on `instrument`.
    fn calendar(&self, _instrument: &Priceable) -> &dyn BusinessCalendar {
        &WeekendCalendar
    }
}

/// Resolve a single instrument, checking the response shape.
pub fn resolve_one(
    oracle: &dyn PricingOracle,
    instrument: &Priceable,
    as_of: NaiveDate,
) -> Result<Priceable, OracleError> {
    let request = ResolveRequest { as_of, instrument: instrument.clone() };
    let mut resolved = oracle.resolve(std::slice::from_ref(&request))?;
    if resolved.len() != 1 {
        return Err(OracleError::ShapeMismatch { expected: 1, actual: resolved.len() });
    }
    Ok(resolved.remove(0))
}
