//! Three-panel star analysis chart: daily stars, z-scores, cumulative stars.

use chrono::{Datelike, Months, NaiveDate};

use crate::analyzers::analyzer::AnalysisPlan;
use crate::analyzers::zscore::is_outlier;
use crate::config::{ChartEvent, DateRange};
use crate::plot::svg::{Dash, Scale, Svg, format_thousands, tick_label, ticks};
use crate::series::{StarDay, cumulative_stars};

/// Cumulative-star levels drawn as reference lines once reached.
pub const MILESTONES: [u64; 4] = [1_000, 5_000, 10_000, 20_000];

const WIDTH: f64 = 1600.0;
const PANEL_HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 100.0;
const MARGIN_RIGHT: f64 = 40.0;
const PANEL_TOP: f64 = 60.0;
const PANEL_BOTTOM: f64 = 70.0;

const BASELINE_COLOR: &str = "green";
const SPIKE_COLOR: &str = "red";
const EVENT_COLORS: [&str; 4] = ["purple", "orange", "teal", "brown"];

/// What to draw besides the series itself.
#[derive(Debug, Clone)]
pub struct AnalysisChart<'a> {
    pub project: &'a str,
    pub plan: AnalysisPlan,
    pub events: &'a [ChartEvent],
}

/// Horizontal geometry shared by all panels.
struct Frame {
    x: Scale,
    first: NaiveDate,
    left: f64,
    right: f64,
}

impl Frame {
    fn new(series: &[StarDay]) -> Option<Self> {
        let first = series.first()?.date;
        let last = series.last()?.date;
        let span = (last - first).num_days() as f64;
        Some(Self {
            x: Scale::new((0.0, span), (MARGIN_LEFT, WIDTH - MARGIN_RIGHT)),
            first,
            left: MARGIN_LEFT,
            right: WIDTH - MARGIN_RIGHT,
        })
    }

    fn px(&self, date: NaiveDate) -> f64 {
        self.x.map((date - self.first).num_days() as f64)
    }
}

/// Vertical geometry of one panel.
struct Panel {
    top: f64,
    bottom: f64,
    y: Scale,
}

impl Panel {
    fn new(index: usize, y_min: f64, y_max: f64) -> Self {
        let top = index as f64 * PANEL_HEIGHT + PANEL_TOP;
        let bottom = (index + 1) as f64 * PANEL_HEIGHT - PANEL_BOTTOM;
        Self {
            top,
            bottom,
            y: Scale::new((y_min, y_max), (bottom, top)),
        }
    }
}

/// Renders the analysis chart as an SVG document.
///
/// Days without a z-score are left out of the z-score panel; infinite
/// scores are pinned to the panel edge.
pub fn render_analysis_svg(series: &[StarDay], chart: &AnalysisChart<'_>) -> String {
    let mut svg = Svg::new(WIDTH, PANEL_HEIGHT * 3.0);
    let Some(frame) = Frame::new(series) else {
        svg.text(WIDTH / 2.0, PANEL_HEIGHT, "No data", 24.0, "middle", true);
        return svg.finish();
    };

    draw_daily_panel(&mut svg, &frame, series, chart);
    draw_zscore_panel(&mut svg, &frame, series, chart);
    draw_cumulative_panel(&mut svg, &frame, series, chart);

    svg.finish()
}

fn draw_daily_panel(svg: &mut Svg, frame: &Frame, series: &[StarDay], chart: &AnalysisChart<'_>) {
    let max = series.iter().map(|d| d.stars).max().unwrap_or(0) as f64;
    let panel = Panel::new(0, 0.0, (max * 1.05).max(1.0));
    draw_axes(svg, frame, &panel, "Stars per Day");
    svg.text(
        WIDTH / 2.0,
        panel.top - 25.0,
        &format!("{} GitHub Stars - Daily Acquisition Pattern", chart.project),
        22.0,
        "middle",
        true,
    );

    let values: Vec<f64> = series.iter().map(|d| d.stars as f64).collect();
    shade_under(svg, frame, &panel, series, &values, &chart.plan.baseline, BASELINE_COLOR, 0.2);
    shade_under(svg, frame, &panel, series, &values, &chart.plan.spike, SPIKE_COLOR, 0.3);
    svg.polyline(&curve(frame, &panel, series, &values), "steelblue", 1.5);

    let mut legend = vec![
        (BASELINE_COLOR, format!("Baseline Period ({})", chart.plan.baseline)),
        (SPIKE_COLOR, format!("Spike Period ({})", chart.plan.spike)),
    ];
    for (event, color) in chart.events.iter().zip(EVENT_COLORS.iter().cycle()) {
        if !in_frame(frame, series, event.date) {
            continue;
        }
        let x = frame.px(event.date);
        svg.line(x, panel.top, x, panel.bottom, color, 2.0, Dash::Dashed);
        legend.push((*color, event.label.clone()));
    }
    draw_legend(svg, &panel, &legend);
}

fn draw_zscore_panel(svg: &mut Svg, frame: &Frame, series: &[StarDay], chart: &AnalysisChart<'_>) {
    let threshold = chart.plan.threshold;
    let finite: Vec<f64> = series
        .iter()
        .filter_map(|d| d.z_score)
        .filter(|z| z.is_finite())
        .collect();
    let lo = finite.iter().copied().fold(-threshold - 2.0, f64::min);
    let hi = finite.iter().copied().fold(threshold + 2.0, f64::max);
    let panel = Panel::new(1, lo, hi * 1.05);
    draw_axes(svg, frame, &panel, "Z-Score");
    svg.text(
        WIDTH / 2.0,
        panel.top - 25.0,
        "Statistical Anomaly Detection (Z-Scores)",
        22.0,
        "middle",
        true,
    );

    let spike = &chart.plan.spike;
    let start = frame.px(spike.start.max(frame.first));
    let end = frame.px(spike.end.min(series.last().map_or(spike.end, |d| d.date)));
    if end > start {
        svg.rect(start, panel.top, end - start, panel.bottom - panel.top, SPIKE_COLOR, 0.15);
    }

    for (level, dash, color) in [
        (threshold, Dash::Dashed, SPIKE_COLOR),
        (-threshold, Dash::Dashed, SPIKE_COLOR),
        (0.0, Dash::Solid, "gray"),
    ] {
        let y = panel.y.map_clamped(level);
        svg.line(frame.left, y, frame.right, y, color, if level == 0.0 { 0.5 } else { 2.0 }, dash);
    }

    let points: Vec<(f64, f64)> = series
        .iter()
        .filter_map(|d| Some((frame.px(d.date), panel.y.map_clamped(d.z_score?))))
        .collect();
    svg.polyline(&points, "darkblue", 1.5);

    for day in series {
        if let Some(z) = day.z_score.filter(|&z| is_outlier(z, threshold)) {
            svg.circle(frame.px(day.date), panel.y.map_clamped(z), 6.0, SPIKE_COLOR, 0.7);
        }
    }

    draw_legend(
        svg,
        &panel,
        &[
            (SPIKE_COLOR, format!("{threshold}σ threshold")),
            (SPIKE_COLOR, format!("Outliers (|z| > {threshold})")),
        ],
    );
}

fn draw_cumulative_panel(svg: &mut Svg, frame: &Frame, series: &[StarDay], chart: &AnalysisChart<'_>) {
    let cumulative: Vec<f64> = cumulative_stars(series).into_iter().map(|c| c as f64).collect();
    let max = cumulative.last().copied().unwrap_or(0.0);
    let panel = Panel::new(2, 0.0, (max * 1.05).max(1.0));
    draw_axes(svg, frame, &panel, "Cumulative Stars");
    svg.text(
        WIDTH / 2.0,
        panel.top - 25.0,
        "Cumulative GitHub Stars Over Time",
        22.0,
        "middle",
        true,
    );
    svg.text(WIDTH / 2.0, panel.bottom + 62.0, "Date", 16.0, "middle", true);

    for milestone in MILESTONES.iter().filter(|&&m| m as f64 <= max) {
        let y = panel.y.map(*milestone as f64);
        svg.line(frame.left, y, frame.right, y, "gray", 1.0, Dash::Dotted);
        svg.text(frame.left + 5.0, y - 4.0, &format_thousands(*milestone as i64), 11.0, "start", false);
    }

    shade_under(svg, frame, &panel, series, &cumulative, &chart.plan.spike, SPIKE_COLOR, 0.2);
    svg.polyline(&curve(frame, &panel, series, &cumulative), "darkgreen", 2.0);
    draw_legend(svg, &panel, &[("darkgreen", "Total Stars".to_string())]);
}

fn in_frame(frame: &Frame, series: &[StarDay], date: NaiveDate) -> bool {
    date >= frame.first && series.last().is_some_and(|d| date <= d.date)
}

fn curve(frame: &Frame, panel: &Panel, series: &[StarDay], values: &[f64]) -> Vec<(f64, f64)> {
    series
        .iter()
        .zip(values)
        .map(|(d, &v)| (frame.px(d.date), panel.y.map(v)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn shade_under(
    svg: &mut Svg,
    frame: &Frame,
    panel: &Panel,
    series: &[StarDay],
    values: &[f64],
    range: &DateRange,
    color: &str,
    opacity: f64,
) {
    let top: Vec<(f64, f64)> = series
        .iter()
        .zip(values)
        .filter(|(d, _)| range.contains(d.date))
        .map(|(d, &v)| (frame.px(d.date), panel.y.map(v)))
        .collect();
    let (Some(&(x0, _)), Some(&(x1, _))) = (top.first(), top.last()) else {
        return;
    };
    let baseline = panel.y.map(0.0).min(panel.bottom);
    let mut points = Vec::with_capacity(top.len() + 2);
    points.push((x0, baseline));
    points.extend(top);
    points.push((x1, baseline));
    svg.polygon(&points, color, opacity);
}

fn draw_axes(svg: &mut Svg, frame: &Frame, panel: &Panel, y_label: &str) {
    svg.line(frame.left, panel.bottom, frame.right, panel.bottom, "black", 1.0, Dash::Solid);
    svg.line(frame.left, panel.top, frame.left, panel.bottom, "black", 1.0, Dash::Solid);

    let (lo, hi) = panel.y.domain();
    for v in ticks(lo, hi, 5) {
        let y = panel.y.map(v);
        svg.line(frame.left, y, frame.right, y, "#cccccc", 0.5, Dash::Solid);
        svg.text(frame.left - 8.0, y + 4.0, &tick_label(v), 11.0, "end", false);
    }

    for month in month_ticks(frame.first, frame_last(frame)) {
        let x = frame.px(month);
        svg.line(x, panel.bottom, x, panel.bottom + 5.0, "black", 1.0, Dash::Solid);
        svg.slanted_text(x, panel.bottom + 18.0, &month.format("%Y-%m").to_string(), 11.0);
    }

    let mid = (panel.top + panel.bottom) / 2.0;
    svg.text(frame.left - 60.0, mid, y_label, 14.0, "middle", true);
}

fn frame_last(frame: &Frame) -> NaiveDate {
    let (_, span) = frame.x.domain();
    frame.first + chrono::Duration::days(span.round() as i64)
}

/// First day of every other month within `[first, last]`.
pub fn month_ticks(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut ticks = Vec::new();
    let Some(mut month) = NaiveDate::from_ymd_opt(first.year(), first.month(), 1) else {
        return ticks;
    };
    if month < first {
        month = match month.checked_add_months(Months::new(1)) {
            Some(m) => m,
            None => return ticks,
        };
    }
    while month <= last {
        ticks.push(month);
        month = match month.checked_add_months(Months::new(2)) {
            Some(m) => m,
            None => break,
        };
    }
    ticks
}

fn draw_legend(svg: &mut Svg, panel: &Panel, entries: &[(&str, String)]) {
    let x = MARGIN_LEFT + 15.0;
    let mut y = panel.top + 15.0;
    let width = entries
        .iter()
        .map(|(_, label)| label.chars().count() as f64 * 7.0 + 40.0)
        .fold(120.0, f64::max);
    svg.outlined_rect(x - 5.0, y - 5.0, width, entries.len() as f64 * 20.0 + 8.0, "#ffffff", 0.85);
    for (color, label) in entries {
        svg.rect(x, y + 2.0, 18.0, 10.0, color, 0.7);
        svg.text(x + 26.0, y + 11.0, label, 12.0, "start", false);
        y += 20.0;
    }
}
