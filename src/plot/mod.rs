//! Chart rendering.
//!
//! Charts are written as standalone SVG documents:
//! - `analysis.rs`: daily stars, z-scores and cumulative stars, stacked
//! - `comparison.rs`: downloads-per-star bars across projects
//! - `svg.rs`: the small drawing layer both are built on

pub mod analysis;
pub mod comparison;
pub mod svg;

pub use analysis::{AnalysisChart, render_analysis_svg};
pub use comparison::{comparison_ratios, downloads_per_star, render_comparison_svg};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::series::StarDay;

/// Renders the analysis chart to `path`.
pub fn create_analysis_plot(
    series: &[StarDay],
    chart: &AnalysisChart<'_>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_analysis_svg(series, chart))
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Visualization saved");
    Ok(())
}

/// Renders the downloads-per-star comparison to `path`.
pub fn create_comparison_plot(
    ratios: &[(String, f64)],
    highlight: &str,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_comparison_svg(ratios, highlight))
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Comparison plot saved");
    Ok(())
}
