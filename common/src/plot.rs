use std::fmt::Write as _;

use thiserror::Error;

use crate::report::SeriesSet;

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Completion time per problem size, per thread count".to_owned(),
            x_label: "Problem size".to_owned(),
            y_label: "Time (s)".to_owned(),
            width: 960,
            height: 600,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PlotError {
    #[error("no series to plot")]
    EmptySeries,
    #[error("series for {threads} threads has no points")]
    EmptyCurve { threads: u32 },
}

const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 55.0;

/// Largest of 1/2/5 times a power of ten that divides `range` into roughly
/// `target` intervals.
fn nice_step(range: f64, target: f64) -> f64 {
    let raw = range / target;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn tick_label(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    };
    format!("{value:.decimals$}")
}

fn ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut tick = (min / step).ceil() * step;
    while tick <= max + step * 1e-6 {
        out.push(tick);
        tick += step;
    }
    out
}

/// Renders one connected, point-marked curve per thread count on a shared
/// SVG chart: size on x, elapsed seconds on y, major and minor gridlines,
/// legend entries in ascending thread-count order.
pub fn render_line_chart(set: &SeriesSet, cfg: &ChartConfig) -> Result<String, PlotError> {
    if set.is_empty() {
        return Err(PlotError::EmptySeries);
    }
    for (threads, points) in &set.series {
        if points.is_empty() {
            return Err(PlotError::EmptyCurve { threads: *threads });
        }
    }

    let all_points = set.series.values().flatten();
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_max = 0.0f64;
    for (size, time) in all_points {
        x_min = x_min.min(*size as f64);
        x_max = x_max.max(*size as f64);
        y_max = y_max.max(*time);
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= 0.0 {
        y_max = 1.0;
    }
    y_max *= 1.05;
    let y_min = 0.0f64;

    let width = cfg.width as f64;
    let height = cfg.height as f64;
    let px0 = MARGIN_LEFT;
    let px1 = width - MARGIN_RIGHT;
    let py0 = MARGIN_TOP;
    let py1 = height - MARGIN_BOTTOM;

    let x_px = |x: f64| px0 + (x - x_min) / (x_max - x_min) * (px1 - px0);
    let y_px = |y: f64| py1 - (y - y_min) / (y_max - y_min) * (py1 - py0);

    let mut svg = String::with_capacity(16 * 1024);
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        cfg.width, cfg.height, cfg.width, cfg.height
    )
    .ok();
    writeln!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##).ok();
    writeln!(
        svg,
        r#"<text x="{:.0}" y="28" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
        width / 2.0,
        cfg.title
    )
    .ok();

    let x_step = nice_step(x_max - x_min, 6.0);
    let y_step = nice_step(y_max - y_min, 6.0);

    // minor gridlines first so the major ones draw over them
    for tick in ticks(x_min, x_max, x_step / 5.0) {
        let x = x_px(tick);
        writeln!(
            svg,
            r##"<line class="grid-minor" x1="{x:.1}" y1="{py0:.1}" x2="{x:.1}" y2="{py1:.1}" stroke="#999999" stroke-width="0.5" stroke-dasharray="1,3"/>"##
        )
        .ok();
    }
    for tick in ticks(y_min, y_max, y_step / 5.0) {
        let y = y_px(tick);
        writeln!(
            svg,
            r##"<line class="grid-minor" x1="{px0:.1}" y1="{y:.1}" x2="{px1:.1}" y2="{y:.1}" stroke="#999999" stroke-width="0.5" stroke-dasharray="1,3"/>"##
        )
        .ok();
    }
    for tick in ticks(x_min, x_max, x_step) {
        let x = x_px(tick);
        writeln!(
            svg,
            r##"<line class="grid-major" x1="{x:.1}" y1="{py0:.1}" x2="{x:.1}" y2="{py1:.1}" stroke="#888888" stroke-width="0.5"/>"##
        )
        .ok();
        writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="11">{}</text>"#,
            py1 + 16.0,
            tick_label(tick, x_step)
        )
        .ok();
    }
    for tick in ticks(y_min, y_max, y_step) {
        let y = y_px(tick);
        writeln!(
            svg,
            r##"<line class="grid-major" x1="{px0:.1}" y1="{y:.1}" x2="{px1:.1}" y2="{y:.1}" stroke="#888888" stroke-width="0.5"/>"##
        )
        .ok();
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
            px0 - 6.0,
            y + 4.0,
            tick_label(tick, y_step)
        )
        .ok();
    }

    writeln!(
        svg,
        r##"<rect x="{px0:.1}" y="{py0:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#333333"/>"##,
        px1 - px0,
        py1 - py0
    )
    .ok();
    writeln!(
        svg,
        r#"<text x="{:.0}" y="{:.0}" text-anchor="middle" font-family="sans-serif" font-size="13">{}</text>"#,
        (px0 + px1) / 2.0,
        height - 12.0,
        cfg.x_label
    )
    .ok();
    writeln!(
        svg,
        r#"<text x="18" y="{:.0}" text-anchor="middle" font-family="sans-serif" font-size="13" transform="rotate(-90 18 {:.0})">{}</text>"#,
        (py0 + py1) / 2.0,
        (py0 + py1) / 2.0,
        cfg.y_label
    )
    .ok();

    // BTreeMap iteration gives ascending thread counts, so curve colors and
    // legend entries line up
    for (idx, (threads, points)) in set.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let coords = points
            .iter()
            .map(|(size, time)| format!("{:.1},{:.1}", x_px(*size as f64), y_px(*time)))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            svg,
            r#"<polyline class="curve" points="{coords}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
        )
        .ok();
        for (size, time) in points {
            writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{color}"/>"#,
                x_px(*size as f64),
                y_px(*time)
            )
            .ok();
        }

        let legend_y = py0 + 14.0 + idx as f64 * 18.0;
        writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{legend_y:.1}" x2="{:.1}" y2="{legend_y:.1}" stroke="{color}" stroke-width="2"/>"#,
            px0 + 10.0,
            px0 + 34.0
        )
        .ok();
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" class="legend">{threads}</text>"#,
            px0 + 40.0,
            legend_y + 4.0
        )
        .ok();
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample_set() -> SeriesSet {
        let mut series = BTreeMap::new();
        series.insert(2u32, vec![(101u64, 0.1234f64), (201, 0.4567)]);
        series.insert(4, vec![(101, 0.08), (201, 0.31)]);
        SeriesSet { series }
    }

    #[test]
    fn one_curve_and_legend_entry_per_thread_count() {
        let svg = render_line_chart(&sample_set(), &ChartConfig::default()).unwrap();
        assert_eq!(svg.matches(r#"class="curve""#).count(), 2);
        assert_eq!(svg.matches(r#"class="legend""#).count(), 2);
        let legend_2 = svg.find(r#"class="legend">2<"#).unwrap();
        let legend_4 = svg.find(r#"class="legend">4<"#).unwrap();
        assert!(legend_2 < legend_4, "legend must be ascending");
    }

    #[test]
    fn draws_major_and_minor_gridlines() {
        let svg = render_line_chart(&sample_set(), &ChartConfig::default()).unwrap();
        assert!(svg.contains(r#"class="grid-major""#));
        assert!(svg.contains(r#"class="grid-minor""#));
    }

    #[test]
    fn marks_every_point() {
        let svg = render_line_chart(&sample_set(), &ChartConfig::default()).unwrap();
        assert_eq!(svg.matches("<circle").count(), 4);
    }

    #[test]
    fn empty_series_set_is_an_error() {
        let err = render_line_chart(&SeriesSet::default(), &ChartConfig::default()).unwrap_err();
        assert_eq!(err, PlotError::EmptySeries);
    }

    #[test]
    fn empty_curve_is_an_error() {
        let mut set = sample_set();
        set.series.insert(8, Vec::new());
        assert_eq!(
            render_line_chart(&set, &ChartConfig::default()),
            Err(PlotError::EmptyCurve { threads: 8 })
        );
    }

    #[test]
    fn single_point_series_renders() {
        let mut series = BTreeMap::new();
        series.insert(1u32, vec![(101u64, 0.5f64)]);
        let svg = render_line_chart(&SeriesSet { series }, &ChartConfig::default()).unwrap();
        assert!(svg.contains("<circle"));
    }
}
