//! Constraints under which a trigger generator may fire an action.
//!
//! Passive configuration: actions never read it. Trigger generation lives
//! outside this crate.

use crate::domain::Tenor;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequirements {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Recurrence between generated triggers.
    #[serde(default)]
    pub frequency: Option<Tenor>,
    /// Calendar name the generator should use.
    #[serde(default)]
    pub calendar: Option<String>,
}

impl ActionRequirements {
    pub fn new(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        frequency: Option<Tenor>,
        calendar: Option<String>,
    ) -> Self {
        Self { start_date, end_date, frequency, calendar }
    }

    /// Whether `date` falls in the (inclusive, possibly unbounded) date range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}
