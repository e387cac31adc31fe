//! Serializable simulation configuration.
//!
//! A simulation is described in TOML: the ledger dates, the tracked risk
//! measures, a holiday calendar, an optional unit-risk table for the built-in
//! [`TableOracle`], and an ordered list of actions with their trigger dates.
//!
//! Dates are quoted ISO strings (`"2024-01-02"`), not TOML date literals.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use actionlab_core::calendar::{business_days, BusinessCalendar, HolidayCalendar};
use actionlab_core::domain::{Priceable, RiskMeasure};
use actionlab_core::{
    Action, ActionRequirements, AddTradeAction, BacktestLedger, HedgeAction, NameSequence,
    TableOracle, TradeDuration,
};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config defines no simulation dates")]
    NoStates,
    #[error("config tracks no risk measures")]
    NoRisks,
    #[error("action '{action}': {reason}")]
    InvalidAction { action: String, reason: String },
}

/// Complete description of one simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Explicit ledger dates. Takes precedence over `start_date`/`end_date`.
    #[serde(default)]
    pub states: Vec<NaiveDate>,

    /// First business day of the simulation (inclusive).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Last business day of the simulation (inclusive).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    pub risks: Vec<RiskMeasure>,

    #[serde(default)]
    pub calendar: Option<HolidayCalendar>,

    #[serde(default)]
    pub unit_risks: Vec<UnitRiskConfig>,

    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

fn default_name() -> String {
    "simulation".to_string()
}

/// Risk per unit notional for an instrument type, fed to [`TableOracle`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitRiskConfig {
    pub instrument_type: String,
    pub risk: RiskMeasure,
    pub value: f64,
    /// Restrict the value to one date; applies to every date when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// One configured action (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionSpec {
    /// Insert instruments over a lifecycle window.
    AddTrade {
        #[serde(default)]
        name: Option<String>,
        priceables: Vec<Priceable>,
        #[serde(default)]
        dated_priceables: BTreeMap<NaiveDate, Vec<Priceable>>,
        #[serde(default)]
        trade_duration: TradeDuration,
        #[serde(default)]
        triggers: Vec<NaiveDate>,
        #[serde(default)]
        requirements: Option<ActionRequirements>,
    },

    /// Size an offsetting position from measured exposure.
    Hedge {
        #[serde(default)]
        name: Option<String>,
        risk: RiskMeasure,
        priceable: Priceable,
        #[serde(default)]
        trade_duration: TradeDuration,
        #[serde(default)]
        risks_on_final_day: bool,
        #[serde(default)]
        triggers: Vec<NaiveDate>,
        #[serde(default)]
        requirements: Option<ActionRequirements>,
    },
}

impl ActionSpec {
    /// Configured name, or a placeholder for error messages.
    pub fn label(&self) -> &str {
        let name = match self {
            ActionSpec::AddTrade { name, .. } | ActionSpec::Hedge { name, .. } => name,
        };
        name.as_deref().unwrap_or("<unnamed>")
    }

    fn triggers(&self) -> &[NaiveDate] {
        match self {
            ActionSpec::AddTrade { triggers, .. } | ActionSpec::Hedge { triggers, .. } => triggers,
        }
    }

    fn requirements(&self) -> Option<&ActionRequirements> {
        match self {
            ActionSpec::AddTrade { requirements, .. } | ActionSpec::Hedge { requirements, .. } => {
                requirements.as_ref()
            }
        }
    }

    /// Trigger dates: the explicit list, or dates generated from the
    /// requirements' start date and frequency up to their end date.
    ///
    /// Generated dates are rolled to the next business day on `calendar`.
    pub fn trigger_dates(
        &self,
        calendar: &dyn BusinessCalendar,
    ) -> Result<Vec<NaiveDate>, ConfigError> {
        if !self.triggers().is_empty() {
            return Ok(self.triggers().to_vec());
        }
        let invalid = |reason: &str| ConfigError::InvalidAction {
            action: self.label().to_string(),
            reason: reason.to_string(),
        };
        let req = self.requirements().ok_or_else(|| invalid("no triggers and no requirements"))?;
        let (Some(start), Some(end), Some(frequency)) =
            (req.start_date, req.end_date, req.frequency)
        else {
            return Err(invalid("generated triggers need start_date, end_date and frequency"));
        };

        if frequency.count == 0 {
            return Err(invalid("frequency does not advance"));
        }

        // Each date is start + k * frequency, so month ends do not drift.
        let mut dates = Vec::new();
        for k in 0.. {
            let Some(rolled) = frequency.times(k).and_then(|step| step.advance(start, calendar))
            else {
                break;
            };
            if rolled > end {
                break;
            }
            if dates.last() != Some(&rolled) {
                dates.push(rolled);
            }
        }
        Ok(dates)
    }
}

impl SimulationConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The configured holiday calendar, or plain weekends.
    pub fn calendar(&self) -> HolidayCalendar {
        self.calendar.clone().unwrap_or_else(|| HolidayCalendar::new("weekends", []))
    }

    /// Ledger dates: the explicit list, else the business days in
    /// `[start_date, end_date]`.
    pub fn state_dates(&self) -> Vec<NaiveDate> {
        if !self.states.is_empty() {
            return self.states.clone();
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => business_days(&self.calendar(), start, end),
            _ => Vec::new(),
        }
    }

    /// An empty ledger over the configured dates and risks.
    pub fn ledger(&self) -> BacktestLedger {
        BacktestLedger::new(self.state_dates(), self.risks.iter().cloned())
    }

    /// A [`TableOracle`] loaded with the configured unit risks and calendar.
    pub fn table_oracle(&self) -> TableOracle {
        let base = TableOracle::new().with_calendar(self.calendar());
        self.unit_risks.iter().fold(base, |oracle, u| {
            let kind = u.instrument_type.as_str();
            match u.date {
                Some(date) => oracle.with_dated_unit_risk(kind, u.risk.clone(), date, u.value),
                None => oracle.with_unit_risk(kind, u.risk.clone(), u.value),
            }
        })
    }

    /// Reject configurations a run could never satisfy.
    ///
    /// Checks: at least one date and one risk; every hedge measures a tracked
    /// risk and fires only on ledger dates; every trigger lies inside its
    /// action's requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let states = self.state_dates();
        if states.is_empty() {
            return Err(ConfigError::NoStates);
        }
        if self.risks.is_empty() {
            return Err(ConfigError::NoRisks);
        }
        let calendar = self.calendar();
        for spec in &self.actions {
            let invalid = |reason: String| ConfigError::InvalidAction {
                action: spec.label().to_string(),
                reason,
            };
            if let ActionSpec::Hedge { risk, .. } = spec {
                if !self.risks.contains(risk) {
                    return Err(invalid(format!("hedged risk '{risk}' is not tracked")));
                }
            }
            let triggers = spec.trigger_dates(&calendar)?;
            if triggers.is_empty() {
                return Err(invalid("no trigger dates".to_string()));
            }
            if let Some(req) = spec.requirements() {
                if let Some(outside) = triggers.iter().find(|t| !req.contains(**t)) {
                    return Err(invalid(format!(
                        "trigger {outside} is outside the required date range"
                    )));
                }
            }
            // A hedge reads exposure measured on its trigger date.
            if matches!(spec, ActionSpec::Hedge { .. }) {
                if let Some(missing) = triggers.iter().find(|t| !states.contains(*t)) {
                    return Err(invalid(format!(
                        "hedge trigger {missing} is not a simulation date"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the configured actions in order, drawing default names from `names`.
    pub fn build(&self, names: &mut NameSequence) -> Result<Vec<ScheduledAction>, ConfigError> {
        let calendar = self.calendar();
        self.actions
            .iter()
            .map(|spec| {
                let triggers = spec.trigger_dates(&calendar)?;
                let action: Box<dyn Action> = match spec.clone() {
                    ActionSpec::AddTrade {
                        name,
                        priceables,
                        dated_priceables,
                        trade_duration,
                        ..
                    } => {
                        let name = names.name_or_next(name);
                        let base = AddTradeAction::with_name(name, priceables, trade_duration);
                        let action = dated_priceables.into_iter().fold(base, |action, (date, set)| {
                            action.with_dated_priceables(date, set)
                        });
                        Box::new(action)
                    }
                    ActionSpec::Hedge {
                        name,
                        risk,
                        priceable,
                        trade_duration,
                        risks_on_final_day,
                        ..
                    } => {
                        let name = names.name_or_next(name);
                        Box::new(HedgeAction::with_name(
                            name,
                            risk,
                            priceable,
                            trade_duration,
                            risks_on_final_day,
                        ))
                    }
                };
                Ok(ScheduledAction::new(action, triggers))
            })
            .collect()
    }
}

/// An action together with the dates it fires on.
#[derive(Debug)]
pub struct ScheduledAction {
    pub action: Box<dyn Action>,
    pub triggers: Vec<NaiveDate>,
}

impl ScheduledAction {
    pub fn new(action: Box<dyn Action>, mut triggers: Vec<NaiveDate>) -> Self {
        triggers.sort();
        triggers.dedup();
        Self { action, triggers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const MINIMAL: &str = r#"
        start_date = "2024-01-01"
        end_date = "2024-01-12"
        risks = ["delta"]

        [calendar]
        name = "nyc"
        holidays = ["2024-01-01"]

        [[actions]]
        type = "ADD_TRADE"
        name = "book"
        trade_duration = "open"
        triggers = ["2024-01-02"]
        priceables = [{ instrument_type = "swap", notional = 10 }]
    "#;

    #[test]
    fn business_day_states_skip_holidays_and_weekends() {
        let config = SimulationConfig::from_toml(MINIMAL).unwrap();
        let states = config.state_dates();
        assert_eq!(states.first(), Some(&d(2024, 1, 2)));
        assert_eq!(states.last(), Some(&d(2024, 1, 12)));
        assert_eq!(states.len(), 9);
        assert_eq!(config.name, "simulation");
    }

    #[test]
    fn explicit_states_win() {
        let toml = MINIMAL.replace(
            "risks = [\"delta\"]",
            "risks = [\"delta\"]\nstates = [\"2024-01-02\", \"2024-01-05\"]",
        );
        let config = SimulationConfig::from_toml(&toml).unwrap();
        assert_eq!(config.state_dates(), vec![d(2024, 1, 2), d(2024, 1, 5)]);
    }

    #[test]
    fn hedge_on_untracked_risk_is_rejected() {
        let toml = format!(
            "{MINIMAL}\n{}",
            r#"
            [[actions]]
            type = "HEDGE"
            name = "h"
            risk = "vega"
            triggers = ["2024-01-03"]
            priceable = { instrument_type = "future", notional = 1 }
            "#
        );
        let err = SimulationConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAction { ref action, .. } if action == "h"));
    }

    #[test]
    fn hedge_on_non_state_date_is_rejected() {
        // GIVEN a hedge firing on a Saturday, which is no simulation date
        let toml = format!(
            "{MINIMAL}\n{}",
            r#"
            [[actions]]
            type = "HEDGE"
            name = "weekend_hedge"
            risk = "delta"
            triggers = ["2024-01-06"]
            priceable = { instrument_type = "future", notional = 1 }
            "#
        );

        // WHEN it is loaded
        let err = SimulationConfig::from_toml(&toml).unwrap_err();

        // THEN validation names the hedge and the date
        match err {
            ConfigError::InvalidAction { action, reason } => {
                assert_eq!(action, "weekend_hedge");
                assert!(reason.contains("2024-01-06"), "{reason}");
            }
            other => panic!("expected invalid action, got {other}"),
        }
    }

    #[test]
    fn trigger_outside_requirements_is_rejected() {
        let toml = format!(
            "{MINIMAL}\n{}",
            r#"
            [actions.requirements]
            start_date = "2024-01-03"
            "#
        );
        let err = SimulationConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("outside the required date range"), "{err}");
    }

    #[test]
    fn triggers_generated_from_frequency() {
        let spec = ActionSpec::AddTrade {
            name: Some("weekly".into()),
            priceables: vec![],
            dated_priceables: BTreeMap::new(),
            trade_duration: TradeDuration::Open,
            triggers: vec![],
            requirements: Some(ActionRequirements::new(
                Some(d(2024, 1, 6)),
                Some(d(2024, 1, 31)),
                Some("1w".parse().unwrap()),
                None,
            )),
        };
        // Saturdays roll to the following Monday.
        let dates = spec.trigger_dates(&HolidayCalendar::new("weekends", [])).unwrap();
        assert_eq!(dates, vec![d(2024, 1, 8), d(2024, 1, 15), d(2024, 1, 22), d(2024, 1, 29)]);
    }

    #[test]
    fn monthly_triggers_keep_month_end() {
        let spec = ActionSpec::Hedge {
            name: Some("monthly".into()),
            risk: RiskMeasure::from("delta"),
            priceable: Priceable::new("future", 1.0),
            trade_duration: TradeDuration::Open,
            risks_on_final_day: false,
            triggers: vec![],
            requirements: Some(ActionRequirements::new(
                Some(d(2024, 1, 31)),
                Some(d(2024, 5, 31)),
                Some("1m".parse().unwrap()),
                None,
            )),
        };
        let dates = spec.trigger_dates(&HolidayCalendar::new("weekends", [])).unwrap();
        // 03-31 is a Sunday and rolls to 04-01; later months still land on the 30th/31st
        assert_eq!(
            dates,
            vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 4, 1), d(2024, 4, 30), d(2024, 5, 31)]
        );
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let spec = ActionSpec::AddTrade {
            name: None,
            priceables: vec![],
            dated_priceables: BTreeMap::new(),
            trade_duration: TradeDuration::Open,
            triggers: vec![],
            requirements: Some(ActionRequirements::new(
                Some(d(2024, 1, 2)),
                Some(d(2024, 1, 31)),
                Some("0d".parse().unwrap()),
                None,
            )),
        };
        let err = spec.trigger_dates(&HolidayCalendar::new("weekends", [])).unwrap_err();
        assert!(err.to_string().contains("does not advance"), "{err}");
    }

    #[test]
    fn missing_triggers_are_rejected() {
        let toml = MINIMAL.replace("triggers = [\"2024-01-02\"]", "");
        let result = SimulationConfig::from_toml(&toml);
        assert!(matches!(result, Err(ConfigError::InvalidAction { .. })));
    }

    #[test]
    fn build_names_unnamed_actions_from_sequence() {
        let toml = MINIMAL.replace("name = \"book\"\n", "");
        let config = SimulationConfig::from_toml(&toml).unwrap();
        let mut names = NameSequence::default();
        let scheduled = config.build(&mut names).unwrap();
        assert_eq!(scheduled[0].action.name(), "Action1");
        assert_eq!(scheduled[0].triggers, vec![d(2024, 1, 2)]);
        assert_eq!(names.peek(), 2);
    }

    #[test]
    fn toml_roundtrip() {
        let config = SimulationConfig::from_toml(MINIMAL).unwrap();
        let back = SimulationConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, back);
    }
}
