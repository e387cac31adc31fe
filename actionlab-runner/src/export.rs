//! Export: JSON run reports and CSV result tables.
//!
//! Persisted reports carry a `schema_version`. Unknown versions are rejected
//! on load, and a report whose ledger no longer matches its fingerprint is
//! treated as corrupt.

use std::path::Path;

use actionlab_core::BacktestLedger;
use anyhow::{bail, Context, Result};

use crate::simulation::{RunReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    let actual = report.ledger.fingerprint().context("failed to fingerprint imported ledger")?;
    if actual != report.fingerprint {
        bail!(
            "ledger fingerprint mismatch: report says {}, ledger hashes to {}",
            report.fingerprint,
            actual
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export ledger results as CSV, one row per date and risk measure.
///
/// Columns: date, risk, aggregate, instruments
pub fn export_results_csv(ledger: &BacktestLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "risk", "aggregate", "instruments"])?;

    for (date, results) in ledger.results() {
        for (risk, result) in results {
            wtr.write_record([
                date.to_string().as_str(),
                risk.as_str(),
                format!("{:.6}", result.aggregate()).as_str(),
                result.len().to_string().as_str(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export ledger positions as CSV, one row per live instrument per date.
///
/// Columns: date, batch, name, instrument_type, notional, resolved_on
pub fn export_positions_csv(ledger: &BacktestLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "batch", "name", "instrument_type", "notional", "resolved_on"])?;

    for (date, batches) in ledger.portfolio_dict() {
        for (i, batch) in batches.iter().enumerate() {
            for p in batch {
                let resolved_on = p.resolved_on.map(|d| d.to_string()).unwrap_or_default();
                wtr.write_record([
                    date.to_string().as_str(),
                    i.to_string().as_str(),
                    p.label(),
                    p.instrument_type.as_str(),
                    format!("{:.6}", p.notional).as_str(),
                    resolved_on.as_str(),
                ])?;
            }
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save a report as `report.json`, `results.csv` and `positions.csv` under `dir`.
pub fn save_artifacts(report: &RunReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let files = [
        ("report.json", export_json(report)?),
        ("results.csv", export_results_csv(&report.ledger)?),
        ("positions.csv", export_positions_csv(&report.ledger)?),
    ];
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Load a report previously written by [`save_artifacts`].
pub fn load_report(dir: &Path) -> Result<RunReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
