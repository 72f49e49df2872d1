/// Visualization module: line/scatter chart for trajectories and calendar series.
///
/// Produces a self-contained HTML fragment with an inline SVG. Each series is
/// wrapped in a `<g>` carrying a `<title>`, so hovering a line shows the
/// location name without any script.
use std::fmt::Write as FmtWrite;

use chrono::NaiveDate;

use crate::selection::ViewData;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 48.0;
const TICKS: usize = 5;

// ── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    Line,
    Points,
}

pub struct ChartConfig {
    pub title: String,
    pub width_px: u32,
    pub height_px: u32,
    pub style: PlotStyle,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Covid-19 trajectories".to_string(),
            width_px: 700,
            height_px: 400,
            style: PlotStyle::Line,
        }
    }
}

/// What to plot.
pub enum ChartData<'a> {
    /// x = days since threshold, y = ln(cases)
    Trajectories(&'a ViewData),
    /// x = calendar date, y = cases
    Calendar {
        location: &'a str,
        points: &'a [(NaiveDate, i64)],
    },
}

// ── Intermediate data structures ────────────────────────────────────────────

struct PlotSeries {
    label: String,
    points: Vec<(f64, f64)>,
}

struct Axes {
    x_label: &'static str,
    y_label: &'static str,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    x_origin: Option<NaiveDate>,
}

fn extract_series(data: &ChartData<'_>) -> (Vec<PlotSeries>, Option<NaiveDate>) {
    match data {
        ChartData::Trajectories(view) => {
            let series = view
                .series
                .iter()
                .map(|s| PlotSeries {
                    label: s.location.clone(),
                    points: s
                        .values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i as f64, *v))
                        .collect(),
                })
                .collect();
            (series, None)
        }
        ChartData::Calendar { location, points } => {
            let origin = points.first().map(|(d, _)| *d);
            let series = origin
                .map(|origin| PlotSeries {
                    label: location.to_string(),
                    points: points
                        .iter()
                        .map(|(d, n)| ((*d - origin).num_days() as f64, *n as f64))
                        .collect(),
                })
                .into_iter()
                .collect();
            (series, origin)
        }
    }
}

fn compute_axes(data: &ChartData<'_>, series: &[PlotSeries], x_origin: Option<NaiveDate>) -> Axes {
    let (x_label, y_label) = match data {
        ChartData::Trajectories(_) => ("Days since threshold", "ln(Cases)"),
        ChartData::Calendar { .. } => ("Date", "Cases"),
    };

    let all = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (0.0f64, 1.0f64, 0.0f64, 1.0f64);
    for (x, y) in all {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }

    Axes {
        x_label,
        y_label,
        x_min,
        x_max,
        y_min,
        y_max,
        x_origin,
    }
}

// ── HTML generation ─────────────────────────────────────────────────────────

/// Main entry point: an HTML `<div>` wrapping an inline SVG chart.
///
/// An empty view still renders the axes, with a note instead of series.
pub fn generate_chart_html(data: &ChartData<'_>, config: &ChartConfig) -> String {
    let (series, x_origin) = extract_series(data);
    let axes = compute_axes(data, &series, x_origin);

    let width = config.width_px.max(200) as f64;
    let height = config.height_px.max(150) as f64;
    let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;

    let sx = |x: f64| MARGIN_LEFT + (x - axes.x_min) / (axes.x_max - axes.x_min) * plot_w;
    let sy = |y: f64| MARGIN_TOP + plot_h - (y - axes.y_min) / (axes.y_max - axes.y_min) * plot_h;

    let mut svg = String::new();
    write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
        w = width,
        h = height
    )
    .unwrap();
    svg.push_str(
        r##"<style>
.axis { stroke: #495057; stroke-width: 1; }
.tick-label { font-family: sans-serif; font-size: 10px; fill: #868e96; }
.axis-label { font-family: sans-serif; font-size: 12px; fill: #495057; }
.title { font-family: sans-serif; font-size: 14px; font-weight: 600; fill: #212529; }
.series:hover { stroke-width: 3; }
</style>"##,
    );

    write!(
        svg,
        r##"<text class="title" x="{x}" y="24">{title}</text>"##,
        x = MARGIN_LEFT,
        title = escape_xml(&config.title)
    )
    .unwrap();

    // Axes
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + plot_h;
    write!(
        svg,
        r##"<line class="axis" x1="{x0}" y1="{y0}" x2="{x1}" y2="{y0}"/><line class="axis" x1="{x0}" y1="{top}" x2="{x0}" y2="{y0}"/>"##,
        x1 = x0 + plot_w,
        top = MARGIN_TOP
    )
    .unwrap();

    for i in 0..=TICKS {
        let frac = i as f64 / TICKS as f64;
        let xv = axes.x_min + frac * (axes.x_max - axes.x_min);
        let yv = axes.y_min + frac * (axes.y_max - axes.y_min);
        write!(
            svg,
            r##"<text class="tick-label" x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"##,
            x = sx(xv),
            y = y0 + 14.0,
            label = escape_xml(&x_tick_label(&axes, xv))
        )
        .unwrap();
        write!(
            svg,
            r##"<text class="tick-label" x="{x:.1}" y="{y:.1}" text-anchor="end">{label}</text>"##,
            x = x0 - 6.0,
            y = sy(yv) + 3.0,
            label = format_number(yv)
        )
        .unwrap();
    }

    write!(
        svg,
        r##"<text class="axis-label" x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"##,
        x = x0 + plot_w / 2.0,
        y = height - 12.0,
        label = axes.x_label
    )
    .unwrap();
    write!(
        svg,
        r##"<text class="axis-label" transform="translate(16,{y:.1}) rotate(-90)" text-anchor="middle">{label}</text>"##,
        y = MARGIN_TOP + plot_h / 2.0,
        label = axes.y_label
    )
    .unwrap();

    // Series
    if series.is_empty() {
        let note = match data {
            ChartData::Trajectories(_) => "No locations selected.".to_string(),
            ChartData::Calendar { location, .. } => format!("No data for {location}."),
        };
        write!(
            svg,
            r##"<text class="axis-label" x="{x:.1}" y="{y:.1}" text-anchor="middle">{note}</text>"##,
            x = x0 + plot_w / 2.0,
            y = MARGIN_TOP + plot_h / 2.0,
            note = escape_xml(&note)
        )
        .unwrap();
    }

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        write!(
            svg,
            r##"<g class="series" data-location="{loc}"><title>{loc}</title>"##,
            loc = escape_xml(&s.label)
        )
        .unwrap();
        match config.style {
            PlotStyle::Line => {
                let points = s
                    .points
                    .iter()
                    .map(|(x, y)| format!("{:.1},{:.1}", sx(*x), sy(*y)))
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(
                    svg,
                    r##"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}"/>"##
                )
                .unwrap();
            }
            PlotStyle::Points => {
                for (x, y) in &s.points {
                    write!(
                        svg,
                        r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="3" fill="{color}" fill-opacity="0.8"/>"##,
                        cx = sx(*x),
                        cy = sy(*y)
                    )
                    .unwrap();
                }
            }
        }
        svg.push_str("</g>");
    }
    svg.push_str("</svg>");

    format!(
        r##"<div style="position:relative; display:inline-block; border:1px solid #dee2e6; border-radius:4px; background:#fff;">{svg}</div>"##
    )
}

fn x_tick_label(axes: &Axes, x: f64) -> String {
    match axes.x_origin {
        Some(origin) => (origin + chrono::Duration::days(x.round() as i64))
            .format("%Y-%m-%d")
            .to_string(),
        None => format_number(x),
    }
}

fn format_number(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v.abs() >= 10_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
