//! ActionLab Core: trigger-activated actions over a backtest ledger.
//!
//! This crate contains the action-application engine:
//! - Domain types (priceables, risk measures and results, tenors)
//! - Trade duration rule mapping a creation date to an inclusive final date
//! - The `Action` trait with add-trade and hedge implementations
//! - Oracle contract for resolution and risk, with date-batched requests
//! - The backtest ledger actions append positions and merge results into
//!
//! Pricing, risk models and trigger selection live outside this crate.

pub mod action;
pub mod calendar;
pub mod domain;
pub mod duration;
pub mod error;
pub mod ledger;
pub mod naming;
pub mod oracle;
pub mod requirements;

pub use action::{Action, AddTradeAction, HedgeAction, SizedHedge, TriggerState};
pub use duration::{final_date, TradeDuration};
pub use error::ActionError;
pub use ledger::BacktestLedger;
pub use naming::NameSequence;
pub use oracle::{PricingOracle, TableOracle};
pub use requirements::ActionRequirements;
