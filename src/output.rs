//! Output formatting and persistence for star data and analysis results.
//!
//! Supports pretty JSON files, the daily and z-score CSVs, and the logged
//! human-readable summary.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::analyzer::Analysis;
use crate::series::{DailyStars, StarDay};
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Creates `dir` and any missing parents.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}

/// Writes `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Writes `date,new_stars,total_stars` rows to any writer.
pub fn write_daily_csv_to<W: Write>(writer: W, daily: &[DailyStars]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in daily {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the daily aggregate CSV to `path`.
pub fn write_daily_csv(path: impl AsRef<Path>, daily: &[DailyStars]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_daily_csv_to(file, daily)?;
    debug!(path = %path.display(), rows = daily.len(), "Wrote daily CSV");
    Ok(())
}

/// Writes the analysed series as `date,stars,total_stars,z_score`.
///
/// Non-finite scores are written as `inf` / `-inf`, which the loader reads
/// back unchanged.
pub fn write_zscore_csv(path: impl AsRef<Path>, series: &[StarDay]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(file);
    for day in series {
        wtr.serialize(day)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = series.len(), "Wrote z-score CSV");
    Ok(())
}

/// `daily.csv` → `daily_with_zscores.csv`, next to the input.
pub fn zscore_csv_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stars".to_string());
    input.with_file_name(format!("{stem}_with_zscores.csv"))
}

/// Logs the human-readable analysis summary.
pub fn print_summary(analysis: &Analysis) {
    info!("STATISTICAL ANALYSIS SUMMARY");

    if let Some(b) = &analysis.baseline_stats {
        info!(
            average = %format!("{:.2} stars/day", b.mean),
            total = b.total,
            days = b.days,
            "Baseline period"
        );
    }

    if let Some(s) = &analysis.spike_stats {
        let multiplier = analysis
            .spike_analysis
            .as_ref()
            .map(|a| format!("{:.2}x", a.multiplier))
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            average = %format!("{:.2} stars/day", s.mean),
            multiplier = %multiplier,
            total = s.total,
            days = s.days,
            "Spike period"
        );
    }

    let Some(spike) = &analysis.spike_analysis else {
        info!("Spike period has no data; skipping anomaly detection summary");
        return;
    };

    info!(
        outlier_days = spike.n_outliers,
        expected = %format!("{:.3}", spike.expected_outliers),
        ratio = %format!("{:.1}x", spike.outlier_ratio),
        "Anomaly detection"
    );

    if let (Some(date), Some(stars), Some(z), Some(p)) = (
        spike.max_z_date,
        spike.max_z_stars,
        spike.max_z_score,
        spike.max_z_p_value,
    ) {
        info!(
            %date,
            stars,
            z_score = %format!("{z:.2}"),
            p_value = %format!("{p:.2e}"),
            "Maximum spike"
        );
    }
}
