//! Errors surfaced by action application.
//!
//! Every variant aborts the current `apply` call. Nothing is retried or
//! swallowed inside the core.

use crate::domain::RiskMeasure;
use crate::duration::DurationError;
use crate::oracle::OracleError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    /// The action was wired up wrongly (programmer error).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resolution failed: {source}")]
    Resolution {
        #[source]
        source: OracleError,
    },

    #[error("risk calculation failed: {source}")]
    Calculation {
        #[source]
        source: OracleError,
    },

    /// A hedge trigger read a ledger result that has not been written yet.
    #[error("no {risk} exposure recorded on {date}; measurements must precede hedges")]
    MissingExposure { date: NaiveDate, risk: RiskMeasure },

    /// Unit exposure of the hedge template was zero or not finite.
    #[error("hedge ratio undefined on {date}: unit {risk} exposure is {unit_exposure}")]
    DegenerateHedgeRatio { date: NaiveDate, risk: RiskMeasure, unit_exposure: f64 },

    #[error("trade duration: {0}")]
    Duration(#[from] DurationError),
}

impl ActionError {
    pub fn resolution(source: OracleError) -> Self {
        ActionError::Resolution { source }
    }

    pub fn calculation(source: OracleError) -> Self {
        ActionError::Calculation { source }
    }
}
