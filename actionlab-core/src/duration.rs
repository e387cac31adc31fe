//! Trade duration rule: how long an inserted position stays on the ledger.
//!
//! A position created at `c` with final date `f` is active on every ledger
//! date `s` with `c <= s <= f`. Both ends are inclusive.

use crate::calendar::BusinessCalendar;
use crate::domain::{Priceable, Tenor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Final date of an open-ended position. Past any simulation horizon.
pub const OPEN_END: NaiveDate = NaiveDate::MAX;

/// How long a created position remains active.
///
/// Serialized as a plain string: `"open"`, an ISO date, a tenor such as
/// `"3m"`, or the name of a date attribute such as `"expiration_date"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TradeDuration {
    /// Active through the end of the simulation.
    #[default]
    Open,
    /// Active through an explicit date.
    Until(NaiveDate),
    /// Active through a date attribute of the resolved instrument.
    Attribute(String),
    /// Active through the creation date advanced by a tenor.
    Tenor(Tenor),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DurationError {
    #[error("instrument '{instrument}' has no attribute '{attribute}'")]
    UnknownAttribute { instrument: String, attribute: String },

    #[error("attribute '{attribute}' of instrument '{instrument}' is not a date")]
    NotADate { instrument: String, attribute: String },

    #[error("tenor {tenor} from {from} is out of range for calendar '{calendar}'")]
    TenorOutOfRange { tenor: Tenor, from: NaiveDate, calendar: String },
}

impl FromStr for TradeDuration {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("open") {
            return Ok(TradeDuration::Open);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(TradeDuration::Until(date));
        }
        if let Ok(tenor) = s.parse::<Tenor>() {
            return Ok(TradeDuration::Tenor(tenor));
        }
        Ok(TradeDuration::Attribute(s.to_string()))
    }
}

impl TryFrom<String> for TradeDuration {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradeDuration> for String {
    fn from(duration: TradeDuration) -> Self {
        duration.to_string()
    }
}

impl From<NaiveDate> for TradeDuration {
    fn from(date: NaiveDate) -> Self {
        TradeDuration::Until(date)
    }
}

impl From<Tenor> for TradeDuration {
    fn from(tenor: Tenor) -> Self {
        TradeDuration::Tenor(tenor)
    }
}

impl fmt::Display for TradeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDuration::Open => write!(f, "open"),
            TradeDuration::Until(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TradeDuration::Attribute(name) => write!(f, "{name}"),
            TradeDuration::Tenor(tenor) => write!(f, "{tenor}"),
        }
    }
}

/// Resolve a duration into the inclusive final date of `instrument`.
pub fn final_date(
    instrument: &Priceable,
    creation_date: NaiveDate,
    duration: &TradeDuration,
    calendar: &dyn BusinessCalendar,
) -> Result<NaiveDate, DurationError> {
    match duration {
        TradeDuration::Open => Ok(OPEN_END),
        TradeDuration::Until(date) => Ok(*date),
        TradeDuration::Attribute(attribute) => {
            let value = instrument.attribute(attribute).ok_or_else(|| {
                DurationError::UnknownAttribute {
                    instrument: instrument.label().to_string(),
                    attribute: attribute.clone(),
                }
            })?;
            value.as_date().ok_or_else(|| DurationError::NotADate {
                instrument: instrument.label().to_string(),
                attribute: attribute.clone(),
            })
        }
        TradeDuration::Tenor(tenor) => {
            tenor.advance(creation_date, calendar).ok_or_else(|| DurationError::TenorOutOfRange {
                tenor: *tenor,
                from: creation_date,
                calendar: calendar.name().to_string(),
            })
        }
    }
}

/// Whether a position created at `creation_date` with `final_date` is live on `date`.
pub fn is_active(date: NaiveDate, creation_date: NaiveDate, final_date: NaiveDate) -> bool {
    creation_date <= date && date <= final_date
}
