//! Tenors: relative periods such as `5b`, `3d`, `2w`, `6m`, `1y`.
//!
//! Advancing a date by a tenor rolls the result forward to the next business
//! day of the supplied calendar. Business-day tenors (`b`) count business
//! days directly.

use crate::calendar::BusinessCalendar;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenorUnit {
    BusinessDays,
    Days,
    Weeks,
    Months,
    Years,
}

impl TenorUnit {
    fn suffix(self) -> char {
        match self {
            TenorUnit::BusinessDays => 'b',
            TenorUnit::Days => 'd',
            TenorUnit::Weeks => 'w',
            TenorUnit::Months => 'm',
            TenorUnit::Years => 'y',
        }
    }
}

/// A count of tenor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tenor {
    pub count: u32,
    pub unit: TenorUnit,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TenorParseError {
    #[error("empty tenor")]
    Empty,

    #[error("unknown tenor unit '{0}' (expected one of b, d, w, m, y)")]
    UnknownUnit(char),

    #[error("invalid tenor count in '{0}'")]
    InvalidCount(String),
}

impl Tenor {
    pub fn new(count: u32, unit: TenorUnit) -> Self {
        Self { count, unit }
    }

    /// `k` periods of this tenor, or `None` on overflow.
    pub fn times(&self, k: u32) -> Option<Self> {
        Some(Self::new(self.count.checked_mul(k)?, self.unit))
    }

    /// Advance `from` by this tenor under `calendar`.
    ///
    /// Returns `None` if the result overflows the date range or the calendar
    /// has no business day within reach.
    pub fn advance(&self, from: NaiveDate, calendar: &dyn BusinessCalendar) -> Option<NaiveDate> {
        let raw = match self.unit {
            TenorUnit::BusinessDays => return calendar.add_business_days(from, self.count),
            TenorUnit::Days => from.checked_add_days(Days::new(u64::from(self.count)))?,
            TenorUnit::Weeks => from.checked_add_days(Days::new(7 * u64::from(self.count)))?,
            TenorUnit::Months => from.checked_add_months(Months::new(self.count))?,
            TenorUnit::Years => from.checked_add_months(Months::new(self.count.checked_mul(12)?))?,
        };
        calendar.roll_following(raw)
    }
}

impl FromStr for Tenor {
    type Err = TenorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let last = s.chars().last().ok_or(TenorParseError::Empty)?;
        let unit = match last.to_ascii_lowercase() {
            'b' => TenorUnit::BusinessDays,
            'd' => TenorUnit::Days,
            'w' => TenorUnit::Weeks,
            'm' => TenorUnit::Months,
            'y' => TenorUnit::Years,
            other => return Err(TenorParseError::UnknownUnit(other)),
        };
        let digits = &s[..s.len() - last.len_utf8()];
        let count =
            digits.parse::<u32>().map_err(|_| TenorParseError::InvalidCount(s.to_string()))?;
        Ok(Self { count, unit })
    }
}

impl TryFrom<String> for Tenor {
    type Error = TenorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tenor> for String {
    fn from(tenor: Tenor) -> Self {
        tenor.to_string()
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}
