//! ==============================================================================
//! render.rs - trend renderer
//! ==============================================================================
//!
//! purpose:
//!     redraws, once per poll cycle:
//!     - the current-value display (latest reading + poll status), to the log
//!     - a trend page: two svg panels (temperature, humidity) over the history,
//!       written as a self-refreshing html file next to the history log
//!
//!     every record inside the selected period is plotted; the default period
//!     is `all`. an empty history draws empty axes instead of failing.
//!
//! ==============================================================================

use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{HistoryRecord, Reading};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// chart window, relative to the newest record
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "6h")]
    Last6Hours,
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl Period {
    fn window(&self) -> Option<Duration> {
        match self {
            Period::LastHour => Some(Duration::hours(1)),
            Period::Last6Hours => Some(Duration::hours(6)),
            Period::LastDay => Some(Duration::hours(24)),
            Period::LastWeek => Some(Duration::days(7)),
            Period::LastMonth => Some(Duration::days(30)),
            Period::All => None,
        }
    }

    /// records inside the window, sorted by time
    pub fn select(&self, records: &[HistoryRecord]) -> Vec<HistoryRecord> {
        let mut selected = records.to_vec();
        selected.sort_by_key(|r| r.timestamp);

        if let (Some(window), Some(newest)) = (self.window(), selected.last().map(|r| r.timestamp)) {
            let cutoff = newest - window;
            selected.retain(|r| r.timestamp >= cutoff);
        }
        selected
    }
}

/// what the poll loop is doing right now
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    Starting,
    Reading,
    Ok,
    Error(String),
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStatus::Starting => write!(f, "starting..."),
            PollStatus::Reading => write!(f, "reading..."),
            PollStatus::Ok => write!(f, "OK"),
            PollStatus::Error(message) => write!(f, "ERROR -> {}", message),
        }
    }
}

/// the current-value lines
pub fn current_display(latest: Option<&Reading>, status: &PollStatus) -> Vec<String> {
    let (temperature, humidity, when) = match latest {
        Some(r) => (
            format!("{:.1} °C", r.temperature),
            format!("{:.1} %", r.humidity),
            r.timestamp.format(TIME_FORMAT).to_string(),
        ),
        None => ("--.- °C".to_string(), "--.- %".to_string(), "-".to_string()),
    };

    vec![
        format!("Temperature: {}", temperature),
        format!("Humidity: {}", humidity),
        format!("Last reading: {}", when),
        format!("Status: {}", status),
    ]
}

// ==============================================================================
// svg chart
// ==============================================================================

const WIDTH: f64 = 860.0;
const HEIGHT: f64 = 220.0;
const MARGIN: f64 = 50.0;

/// one panel: a polyline of `points` with min/max labels
pub fn chart_svg(title: &str, unit: &str, color: &str, points: &[(NaiveDateTime, f64)]) -> String {
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{MARGIN}" y="{}" font-size="14" font-weight="bold">{}</text>"#,
        MARGIN - 20.0,
        if points.is_empty() { "No data yet" } else { title }
    );

    for i in 0..=4 {
        let y = MARGIN + plot_h * i as f64 / 4.0;
        let _ = writeln!(
            svg,
            r##"  <line x1="{MARGIN}" y1="{y}" x2="{}" y2="{y}" stroke="#ccc" stroke-opacity="0.6"/>"##,
            MARGIN + plot_w
        );
    }
    let _ = writeln!(
        svg,
        r#"  <rect x="{MARGIN}" y="{MARGIN}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
    );

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let t0 = first.0.and_utc().timestamp() as f64;
        let span_t = (last.0.and_utc().timestamp() as f64 - t0).max(1.0);

        let (mut lo, mut hi) = points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));
        if hi - lo < 1e-9 {
            lo -= 1.0;
            hi += 1.0;
        }

        let coords: Vec<String> = points
            .iter()
            .map(|(t, v)| {
                let x = if points.len() == 1 {
                    MARGIN + plot_w / 2.0
                } else {
                    MARGIN + plot_w * (t.and_utc().timestamp() as f64 - t0) / span_t
                };
                let y = MARGIN + plot_h * (1.0 - (v - lo) / (hi - lo));
                format!("{:.1},{:.1}", x, y)
            })
            .collect();

        let _ = writeln!(
            svg,
            r#"  <polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}"/>"#,
            coords.join(" ")
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-size="11" text-anchor="end">{:.1} {unit}</text>"#,
            MARGIN - 4.0,
            MARGIN + 4.0,
            hi
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-size="11" text-anchor="end">{:.1} {unit}</text>"#,
            MARGIN - 4.0,
            MARGIN + plot_h + 4.0,
            lo
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{MARGIN}" y="{}" font-size="11">{}</text>"#,
            HEIGHT - MARGIN + 16.0,
            first.0.format(TIME_FORMAT)
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN + plot_w,
            HEIGHT - MARGIN + 16.0,
            last.0.format(TIME_FORMAT)
        );
    }

    svg.push_str("</svg>");
    svg
}

/// full trend page
pub fn render_page(
    records: &[HistoryRecord],
    latest: Option<&Reading>,
    status: &PollStatus,
    refresh_seconds: u64,
) -> String {
    let temperature: Vec<_> = records.iter().map(|r| (r.timestamp, r.temperature)).collect();
    let humidity: Vec<_> = records.iter().map(|r| (r.timestamp, r.humidity)).collect();

    let current = current_display(latest, status)
        .iter()
        .map(|line| format!("    <p>{}</p>", html_escape(line)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="{refresh_seconds}">
    <title>Trends (history)</title>
</head>
<body style="font-family: system-ui; padding: 1rem;">
{current}
    <p>{count} readings</p>
{temp_chart}
{hum_chart}
</body>
</html>
"#,
        count = records.len(),
        temp_chart = chart_svg("Temperature (°C)", "°C", "#d9534f", &temperature),
        hum_chart = chart_svg("Humidity (%)", "%", "#0275d8", &humidity),
    )
}

/// escape html special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ==============================================================================
// renderer
// ==============================================================================

pub struct TrendRenderer {
    output: PathBuf,
    period: Period,
    refresh_seconds: u64,
}

impl TrendRenderer {
    pub fn new(output: PathBuf, period: Period, refresh_seconds: u64) -> Self {
        Self { output, period, refresh_seconds }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// redraw the current-value display and the trend page
    pub fn refresh(
        &self,
        history: &[HistoryRecord],
        latest: Option<&Reading>,
        status: &PollStatus,
    ) -> std::io::Result<()> {
        tracing::info!("{}", current_display(latest, status).join(" | "));

        let records = self.period.select(history);
        let page = render_page(&records, latest, status, self.refresh_seconds);

        let tmp = self.output.with_extension("html.tmp");
        fs::write(&tmp, page)?;
        fs::rename(&tmp, &self.output)
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SensorSample;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn record(day: u32, hour: u32, temperature: f64) -> HistoryRecord {
        HistoryRecord { timestamp: at(day, hour), temperature, humidity: 50.0 }
    }

    #[test]
    fn test_period_selects_window_from_newest() {
        let records = vec![record(1, 0, 1.0), record(3, 12, 3.0), record(3, 6, 2.0), record(3, 11, 4.0)];

        let all = Period::All.select(&records);
        assert_eq!(all.len(), 4);
        assert_eq!(all.iter().map(|r| r.temperature).collect::<Vec<_>>(), vec![1.0, 2.0, 4.0, 3.0]);

        let six = Period::Last6Hours.select(&records);
        assert_eq!(six.iter().map(|r| r.temperature).collect::<Vec<_>>(), vec![2.0, 4.0, 3.0]);

        let hour = Period::LastHour.select(&records);
        assert_eq!(hour.len(), 2);

        assert!(Period::LastWeek.select(&[]).is_empty());
    }

    #[test]
    fn test_period_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            period: Period,
        }
        let parsed: Wrapper = toml::from_str(r#"period = "24h""#).unwrap();
        assert_eq!(parsed.period, Period::LastDay);
    }

    #[test]
    fn test_current_display() {
        let reading = Reading::at(SensorSample::new(23.456, 55.21), at(1, 8));
        let lines = current_display(Some(&reading), &PollStatus::Ok);
        assert_eq!(lines[0], "Temperature: 23.5 °C");
        assert_eq!(lines[1], "Humidity: 55.2 %");
        assert_eq!(lines[2], "Last reading: 2025-03-01T08:00:00");
        assert_eq!(lines[3], "Status: OK");

        let lines = current_display(None, &PollStatus::Error("connection refused".into()));
        assert_eq!(lines[0], "Temperature: --.- °C");
        assert_eq!(lines[1], "Humidity: --.- %");
        assert_eq!(lines[3], "Status: ERROR -> connection refused");
    }

    #[test]
    fn test_empty_chart() {
        let svg = chart_svg("Temperature (°C)", "°C", "red", &[]);
        assert!(svg.contains("No data yet"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn test_chart_plots_every_point() {
        let points: Vec<_> = (0..10).map(|h| (at(2, h), 20.0 + h as f64)).collect();
        let svg = chart_svg("Temperature (°C)", "°C", "red", &points);
        let polyline = svg.lines().find(|l| l.contains("<polyline")).unwrap();
        let coords = polyline.split("points=\"").nth(1).unwrap().trim_end_matches("\"/>");
        assert_eq!(coords.split(' ').count(), 10);
        assert!(svg.contains("29.0 °C"));
        assert!(svg.contains("20.0 °C"));
    }

    #[test]
    fn test_single_point_chart() {
        let svg = chart_svg("Humidity (%)", "%", "blue", &[(at(2, 3), 40.0)]);
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("41.0 %"));
    }

    #[test]
    fn test_page_escapes_status() {
        let page = render_page(&[], None, &PollStatus::Error("<bad>".into()), 1);
        assert!(page.contains("&lt;bad&gt;"));
        assert!(page.contains(r#"<meta http-equiv="refresh" content="1">"#));
        assert!(page.contains("0 readings"));
    }

    #[test]
    fn test_refresh_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TrendRenderer::new(dir.path().join("trends.html"), Period::All, 1);
        renderer.refresh(&[record(1, 1, 20.0)], None, &PollStatus::Starting).unwrap();

        let page = fs::read_to_string(renderer.output()).unwrap();
        assert!(page.contains("1 readings"));
        assert!(page.contains("Status: starting..."));
    }
}
