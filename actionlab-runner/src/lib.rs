//! ActionLab Runner: simulation orchestration, configuration, export.
//!
//! This crate builds on `actionlab-core` to provide:
//! - TOML simulation configuration with trigger generation and validation
//! - A simulation driver that orders actions so hedges read measured exposure
//! - Portfolio risk measurement between the deterministic and hedge phases
//! - JSON run reports with schema versioning and CSV result tables

pub mod config;
pub mod export;
pub mod simulation;

pub use config::{ActionSpec, ConfigError, ScheduledAction, SimulationConfig, UnitRiskConfig};
pub use export::{
    export_json, export_positions_csv, export_results_csv, import_json, load_report, save_artifacts,
};
pub use simulation::{measure_portfolio, RunError, RunReport, Simulation, SCHEMA_VERSION};
