//! Downloads-per-star bar chart.

use crate::plot::svg::{Dash, Scale, Svg, tick_label, ticks};
use crate::services::{DownloadStats, RepoMetadata};

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 700.0;
const MARGIN_LEFT: f64 = 100.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 120.0;

/// Monthly downloads per star for comparable LLM frameworks.
pub const DEFAULT_RATIOS: [(&str, f64); 4] = [
    ("LangChain", 662.0),
    ("Instructor", 330.0),
    ("LlamaIndex", 93.6),
    ("DSPy", 16.9),
];

/// Last-month downloads divided by current stars.
pub fn downloads_per_star(metadata: &RepoMetadata, downloads: &DownloadStats) -> Option<f64> {
    if metadata.stars == 0 {
        return None;
    }
    Some(downloads.last_month()? as f64 / metadata.stars as f64)
}

/// The default comparison set, with `project`'s bar replaced (or appended)
/// when a measured ratio is available.
pub fn comparison_ratios(project: &str, measured: Option<f64>) -> Vec<(String, f64)> {
    let mut ratios: Vec<(String, f64)> = DEFAULT_RATIOS
        .iter()
        .map(|(name, ratio)| (name.to_string(), *ratio))
        .collect();

    if let Some(ratio) = measured {
        match ratios.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(project)) {
            Some(entry) => entry.1 = ratio,
            None => ratios.push((project.to_string(), ratio)),
        }
    }
    ratios
}

/// Renders the ratio bars; bars named like `highlight` are drawn red.
pub fn render_comparison_svg(ratios: &[(String, f64)], highlight: &str) -> String {
    let mut svg = Svg::new(WIDTH, HEIGHT);
    let (left, right) = (MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
    let (top, bottom) = (MARGIN_TOP, HEIGHT - MARGIN_BOTTOM);

    svg.text(
        WIDTH / 2.0,
        MARGIN_TOP - 35.0,
        "LLM Framework: Downloads-per-Star Ratio Comparison",
        22.0,
        "middle",
        true,
    );
    svg.text(left - 65.0, (top + bottom) / 2.0, "Downloads per Star (Monthly)", 14.0, "middle", true);

    let max = ratios
        .iter()
        .map(|(_, r)| *r)
        .filter(|r| r.is_finite())
        .fold(0.0, f64::max);
    let y = Scale::new((0.0, (max * 1.1).max(1.0)), (bottom, top));

    let (lo, hi) = y.domain();
    for v in ticks(lo, hi, 5) {
        let py = y.map(v);
        svg.line(left, py, right, py, "#cccccc", 0.5, Dash::Solid);
        svg.text(left - 8.0, py + 4.0, &tick_label(v), 11.0, "end", false);
    }
    svg.line(left, bottom, right, bottom, "black", 1.0, Dash::Solid);
    svg.line(left, top, left, bottom, "black", 1.0, Dash::Solid);

    if ratios.is_empty() {
        return svg.finish();
    }

    let slot = (right - left) / ratios.len() as f64;
    let bar_width = slot * 0.6;
    for (i, (name, ratio)) in ratios.iter().enumerate() {
        let center = left + slot * (i as f64 + 0.5);
        let value = if ratio.is_finite() { ratio.max(0.0) } else { 0.0 };
        let bar_top = y.map(value);
        let color = if name.to_lowercase().contains(&highlight.to_lowercase()) {
            "red"
        } else {
            "steelblue"
        };

        svg.outlined_rect(center - bar_width / 2.0, bar_top, bar_width, bottom - bar_top, color, 0.7);
        svg.text(center, bar_top - 6.0, &format!("{value:.1}"), 13.0, "middle", true);
        svg.slanted_text(center, bottom + 20.0, name, 13.0);
    }

    svg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn metadata(stars: u64) -> RepoMetadata {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RepoMetadata {
            name: "acme/rocket".into(),
            description: None,
            created_at: ts,
            stars,
            forks: 0,
            watchers: stars,
            open_issues: 0,
            language: None,
            last_updated: ts,
            fetch_timestamp: None,
        }
    }

    fn downloads(last_month: u64) -> DownloadStats {
        DownloadStats {
            recent: Some(json!({"data": {"last_month": last_month}})),
            overall: None,
        }
    }

    #[test]
    fn test_downloads_per_star() {
        assert_eq!(downloads_per_star(&metadata(100), &downloads(1690)), Some(16.9));
        assert_eq!(downloads_per_star(&metadata(0), &downloads(10)), None);
        assert_eq!(downloads_per_star(&metadata(10), &DownloadStats::default()), None);
    }

    #[test]
    fn test_comparison_ratios_replace_matching_project() {
        let ratios = comparison_ratios("dspy", Some(20.0));
        assert_eq!(ratios.len(), 4);
        assert_eq!(ratios[3], ("DSPy".to_string(), 20.0));
    }

    #[test]
    fn test_comparison_ratios_append_new_project() {
        let ratios = comparison_ratios("rocket", Some(5.0));
        assert_eq!(ratios.len(), 5);
        assert_eq!(ratios[4].0, "rocket");
        assert_eq!(comparison_ratios("rocket", None).len(), 4);
    }

    #[test]
    fn test_render_highlights_project() {
        let ratios = comparison_ratios("dspy", None);
        let svg = render_comparison_svg(&ratios, "DSPy");
        assert!(svg.contains(">662.0<"));
        assert!(svg.contains(">16.9<"));
        assert_eq!(svg.matches(r#"fill="red""#).count(), 1);
        assert_eq!(svg.matches(r#"fill="steelblue""#).count(), 3);
    }
}
