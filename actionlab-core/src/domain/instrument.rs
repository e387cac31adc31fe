use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute carried by a priceable. Untagged so configs can write plain values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttributeValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A position the oracle can resolve and measure.
///
/// The core never interprets `instrument_type` or the attributes beyond
/// reading date attributes for trade durations. `notional` is the only
/// notional-bearing field and the only one touched by [`Priceable::scale`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Priceable {
    #[serde(default)]
    pub name: Option<String>,
    pub instrument_type: String,
    pub notional: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Calendar name the oracle should use for tenor arithmetic.
    #[serde(default)]
    pub calendar: Option<String>,
    /// Set by the oracle when the instrument is resolved.
    #[serde(default)]
    pub resolved_on: Option<NaiveDate>,
}

impl Priceable {
    pub fn new(instrument_type: impl Into<String>, notional: f64) -> Self {
        Self {
            name: None,
            instrument_type: instrument_type.into(),
            notional,
            attributes: BTreeMap::new(),
            calendar: None,
            resolved_on: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// Name if set, else the instrument type. Used as the key in risk results.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.instrument_type)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn date_attribute(&self, key: &str) -> Option<NaiveDate> {
        self.attribute(key).and_then(AttributeValue::as_date)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_on.is_some()
    }

    /// Linear scaling: multiplies the notional, copies everything else.
    pub fn scale(&self, ratio: f64) -> Self {
        Self { notional: self.notional * ratio, ..self.clone() }
    }

    /// Rename to embed the owning action's name.
    ///
    /// Unnamed instruments become `{owner}_Priceable{index}`, named ones
    /// `{owner}_{name}`.
    pub fn adopt(&mut self, owner: &str, index: usize) {
        let renamed = match &self.name {
            Some(name) => format!("{owner}_{name}"),
            None => format!("{owner}_Priceable{index}"),
        };
        self.name = Some(renamed);
    }
}

/// Take ownership of a collection of priceables on behalf of an action.
pub fn adopt_all(owner: &str, priceables: impl IntoIterator<Item = Priceable>) -> Vec<Priceable> {
    priceables
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.adopt(owner, i);
            p
        })
        .collect()
}
