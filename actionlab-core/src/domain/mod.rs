//! Domain types for ActionLab

pub mod ids;
pub mod instrument;
pub mod risk;
pub mod tenor;

pub use ids::{LedgerFingerprint, RiskMeasure};
pub use instrument::{adopt_all, AttributeValue, Priceable};
pub use risk::{DatedResults, RiskResult, RiskResults};
pub use tenor::{Tenor, TenorParseError, TenorUnit};
