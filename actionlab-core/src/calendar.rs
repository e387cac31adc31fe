//! Business calendars used for tenor arithmetic.
//!
//! Holiday data is owned by the oracle (or whoever configures it); the core
//! only asks whether a date is a business day.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Upper bound on how far a roll may search before giving up.
const MAX_ROLL_DAYS: u32 = 3_660;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub trait BusinessCalendar: Send + Sync {
    fn name(&self) -> &str;

    fn is_business_day(&self, date: NaiveDate) -> bool;

    /// First business day on or after `date`.
    fn roll_following(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut current = date;
        for _ in 0..MAX_ROLL_DAYS {
            if self.is_business_day(current) {
                return Some(current);
            }
            current = current.succ_opt()?;
        }
        None
    }

    /// Step forward `n` business days. Zero rolls `date` forward.
    fn add_business_days(&self, date: NaiveDate, n: u32) -> Option<NaiveDate> {
        if n == 0 {
            return self.roll_following(date);
        }
        let limit = 2 * u64::from(n) + u64::from(MAX_ROLL_DAYS);
        let mut current = date;
        let mut remaining = n;
        let mut scanned = 0u64;
        while remaining > 0 {
            current = current.checked_add_days(Days::new(1))?;
            scanned += 1;
            if scanned > limit {
                return None;
            }
            if self.is_business_day(current) {
                remaining -= 1;
            }
        }
        Some(current)
    }
}

/// Monday to Friday, no holidays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekendCalendar;

impl BusinessCalendar for WeekendCalendar {
    fn name(&self) -> &str {
        "weekends"
    }

    fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date)
    }
}

/// Weekends plus an explicit holiday list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    pub name: String,
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(name: impl Into<String>, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self { name: name.into(), holidays: holidays.into_iter().collect() }
    }
}

impl BusinessCalendar for HolidayCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }
}

/// All business days in `[start, end]`.
pub fn business_days(
    calendar: &dyn BusinessCalendar,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).filter(|d| calendar.is_business_day(*d)).collect()
}
