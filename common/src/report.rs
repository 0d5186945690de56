use std::{collections::BTreeMap, str::FromStr, sync::LazyLock};

use eyre::Result;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{grid::ParameterPoint, record::RunRecord};

static PARAMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Thread count:\s*(?P<threads>\S+)\s+Size:\s*(?P<size>\S+)\s+Iterations:\s*(?P<iterations>\S+)\s*$")
        .unwrap()
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Time \(s\):\s*(?P<time>\S+)\s*$").unwrap());

/// Parse failures are fatal for the whole reporting run; no record is
/// silently skipped. Line numbers are 1-based.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("log is empty")]
    Empty,
    #[error("line {line}: expected a `{marker}` line, got: {text}")]
    MissingMarker {
        line: usize,
        marker: &'static str,
        text: String,
    },
    #[error("line {line}: `{token}` is not a valid {what}")]
    BadNumber {
        line: usize,
        token: String,
        what: &'static str,
    },
    #[error("line {line}: parameters line has no matching timing line")]
    Truncated { line: usize },
}

fn field<T: FromStr>(
    caps: &Captures<'_>,
    name: &str,
    line: usize,
    what: &'static str,
) -> Result<T, ParseError> {
    let token = &caps[name];
    token.parse().map_err(|_| ParseError::BadNumber {
        line,
        token: token.to_owned(),
        what,
    })
}

/// Parses a sweep log: records are two consecutive lines, the parameters
/// line followed by the timing line.
pub fn parse_log(text: &str) -> Result<Vec<RunRecord>, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut records = Vec::with_capacity(lines.len() / 2);
    let mut idx = 0;
    while idx < lines.len() {
        let params_line = idx + 1;
        let caps = PARAMS_RE
            .captures(lines[idx])
            .ok_or_else(|| ParseError::MissingMarker {
                line: params_line,
                marker: "Thread count:",
                text: lines[idx].to_owned(),
            })?;
        let threads: u32 = field(&caps, "threads", params_line, "thread count")?;
        let size: u64 = field(&caps, "size", params_line, "size")?;
        let iterations: u64 = field(&caps, "iterations", params_line, "iteration count")?;

        let time_line = params_line + 1;
        let Some(line) = lines.get(idx + 1) else {
            return Err(ParseError::Truncated { line: params_line });
        };
        let caps = TIME_RE.captures(line).ok_or_else(|| ParseError::MissingMarker {
            line: time_line,
            marker: "Time (s):",
            text: (*line).to_owned(),
        })?;
        let elapsed_secs: f64 = field(&caps, "time", time_line, "elapsed time")?;
        if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
            return Err(ParseError::BadNumber {
                line: time_line,
                token: caps["time"].to_owned(),
                what: "elapsed time",
            });
        }

        records.push(RunRecord {
            point: ParameterPoint {
                threads,
                size,
                iterations,
            },
            elapsed_secs,
        });
        idx += 2;
    }

    debug!("Parsed {} records from {} lines", records.len(), lines.len());
    Ok(records)
}

/// Per-thread-count series of (size, elapsed seconds) points, each sorted by
/// size ascending. Derived per reporting run, never persisted.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    pub series: BTreeMap<u32, Vec<(u64, f64)>>,
}

impl SeriesSet {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Flat CSV export of the grouped series, one row per point.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["threads", "size", "time_s"])?;
        for (threads, points) in &self.series {
            for (size, time) in points {
                writer.write_record([
                    threads.to_string(),
                    size.to_string(),
                    time.to_string(),
                ])?;
            }
        }
        let data = writer
            .into_inner()
            .map_err(|err| eyre::eyre!("Finish CSV export: {err}"))?;
        Ok(String::from_utf8(data)?)
    }
}

/// Groups records by thread count, sorting each series by size. The sort is
/// stable, so points with equal sizes keep their log order.
pub fn group_records(records: &[RunRecord]) -> SeriesSet {
    let mut series: BTreeMap<u32, Vec<(u64, f64)>> = BTreeMap::new();
    for record in records {
        series
            .entry(record.point.threads)
            .or_default()
            .push((record.point.size, record.elapsed_secs));
    }
    for points in series.values_mut() {
        points.sort_by_key(|point| point.0);
    }
    SeriesSet { series }
}
