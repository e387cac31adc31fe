//! Table oracle: deterministic in-memory pricing for tests and dry runs.
//!
//! Risk is linear: `value = unit_risk(type, measure, date) * notional`.
//! Resolution stamps `resolved_on` and, for instruments carrying a `tenor`
//! text attribute, fills in `expiration_date` from the as-of date.

use super::{CalcRequest, OracleError, PricingOracle, ResolveRequest};
use crate::calendar::{BusinessCalendar, HolidayCalendar};
use crate::domain::{AttributeValue, DatedResults, Priceable, RiskMeasure, RiskResult, Tenor};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TENOR_ATTRIBUTE: &str = "tenor";
pub const EXPIRATION_ATTRIBUTE: &str = "expiration_date";

pub struct TableOracle {
    name: String,
    calendar: Box<dyn BusinessCalendar>,
    unit_risks: BTreeMap<(String, RiskMeasure), f64>,
    dated_unit_risks: BTreeMap<(String, RiskMeasure, NaiveDate), f64>,
    unresolvable_dates: BTreeSet<NaiveDate>,
    failing_calc_dates: BTreeSet<NaiveDate>,
    resolve_calls: AtomicUsize,
    calc_calls: AtomicUsize,
}

impl Default for TableOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableOracle")
            .field("name", &self.name)
            .field("calendar", &self.calendar.name())
            .field("unit_risks", &self.unit_risks.len())
            .field("resolve_calls", &self.resolve_calls())
            .field("calc_calls", &self.calc_calls())
            .finish()
    }
}

impl TableOracle {
    pub fn new() -> Self {
        Self {
            name: "table".to_string(),
            calendar: Box::new(HolidayCalendar::new("weekends", [])),
            unit_risks: BTreeMap::new(),
            dated_unit_risks: BTreeMap::new(),
            unresolvable_dates: BTreeSet::new(),
            failing_calc_dates: BTreeSet::new(),
            resolve_calls: AtomicUsize::new(0),
            calc_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_calendar(mut self, calendar: impl BusinessCalendar + 'static) -> Self {
        self.calendar = Box::new(calendar);
        self
    }

    /// Risk per unit notional for every instrument of `instrument_type`.
    pub fn with_unit_risk(
        mut self,
        instrument_type: impl Into<String>,
        risk: impl Into<RiskMeasure>,
        value: f64,
    ) -> Self {
        self.unit_risks.insert((instrument_type.into(), risk.into()), value);
        self
    }

    /// Date-specific override of [`TableOracle::with_unit_risk`].
    pub fn with_dated_unit_risk(
        mut self,
        instrument_type: impl Into<String>,
        risk: impl Into<RiskMeasure>,
        date: NaiveDate,
        value: f64,
    ) -> Self {
        self.dated_unit_risks.insert((instrument_type.into(), risk.into(), date), value);
        self
    }

    /// Any resolution request touching `date` fails.
    pub fn failing_resolution_on(mut self, date: NaiveDate) -> Self {
        self.unresolvable_dates.insert(date);
        self
    }

    /// Any calculation request touching `date` fails.
    pub fn failing_calc_on(mut self, date: NaiveDate) -> Self {
        self.failing_calc_dates.insert(date);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::Relaxed)
    }

    pub fn calc_calls(&self) -> usize {
        self.calc_calls.load(Ordering::Relaxed)
    }

    pub fn unit_risk(
        &self,
        instrument_type: &str,
        risk: &RiskMeasure,
        date: NaiveDate,
    ) -> Option<f64> {
        self.dated_unit_risks
            .get(&(instrument_type.to_string(), risk.clone(), date))
            .or_else(|| self.unit_risks.get(&(instrument_type.to_string(), risk.clone())))
            .copied()
    }

    fn resolve_single(&self, request: &ResolveRequest) -> Result<Priceable, OracleError> {
        let mut resolved = request.instrument.clone();
        resolved.resolved_on = Some(request.as_of);

        let tenor_text = match resolved.attribute(TENOR_ATTRIBUTE) {
            Some(AttributeValue::Text(text)) => Some(text.clone()),
            _ => None,
        };
        if resolved.date_attribute(EXPIRATION_ATTRIBUTE).is_none() {
            if let Some(text) = tenor_text {
                let tenor: Tenor = text.parse().map_err(|e| OracleError::Unresolvable {
                    instrument: resolved.label().to_string(),
                    as_of: request.as_of,
                    reason: format!("bad tenor attribute: {e}"),
                })?;
                let expiry = tenor.advance(request.as_of, self.calendar.as_ref()).ok_or_else(|| {
                    OracleError::Unresolvable {
                        instrument: resolved.label().to_string(),
                        as_of: request.as_of,
                        reason: format!("tenor {tenor} out of range"),
                    }
                })?;
                resolved
                    .attributes
                    .insert(EXPIRATION_ATTRIBUTE.to_string(), AttributeValue::Date(expiry));
            }
        }
        Ok(resolved)
    }
}

impl PricingOracle for TableOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, requests: &[ResolveRequest]) -> Result<Vec<Priceable>, OracleError> {
        self.resolve_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(bad) = requests.iter().find(|r| self.unresolvable_dates.contains(&r.as_of)) {
            return Err(OracleError::Unresolvable {
                instrument: bad.instrument.label().to_string(),
                as_of: bad.as_of,
                reason: "no market data".to_string(),
            });
        }
        requests.iter().map(|r| self.resolve_single(r)).collect()
    }

    fn calc(&self, request: &CalcRequest) -> Result<DatedResults, OracleError> {
        self.calc_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(bad) = request.dates.iter().find(|d| self.failing_calc_dates.contains(*d)) {
            return Err(OracleError::CalculationFailed(format!("no market data on {bad}")));
        }

        let mut out = DatedResults::new();
        for date in &request.dates {
            let per_date = out.entry(*date).or_default();
            for risk in &request.risks {
                let mut result = RiskResult::new();
                for instrument in &request.instruments {
                    let kind = &instrument.instrument_type;
                    let unit = self.unit_risk(kind, risk, *date).ok_or_else(|| {
                        OracleError::CalculationFailed(format!(
                            "no {risk} for instrument type '{kind}'"
                        ))
                    })?;
                    result.add(instrument.label(), unit * instrument.notional);
                }
                per_date.insert(risk.clone(), result);
            }
        }
        Ok(out)
    }

    fn calendar(&self, _instrument: &Priceable) -> &dyn BusinessCalendar {
        self.calendar.as_ref()
    }
}
