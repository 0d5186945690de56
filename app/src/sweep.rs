use std::{process::Stdio, time::Instant};

use chrono::Local;
use common::{
    config::Config,
    grid::enumerate_grid,
    record::{LogWriter, RunRecord},
};
use eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Error, Debug)]
#[error("Launch benchmark binary {binary}: {source}")]
pub struct ProcessLaunchError {
    binary: String,
    #[source]
    source: std::io::Error,
}

/// Runs every grid cell sequentially: one child process at a time, timed
/// wall-clock from before the spawn to after exit, one log record per cell.
/// A spawn failure aborts the sweep; records already on disk stay valid.
pub async fn run_sweep(config: Config, no_progress: bool) -> Result<()> {
    let grid = enumerate_grid(&config.thread_counts, config.sizes, config.iterations);
    println!(
        "Sweep {} started {} ({} cells, log {})",
        config.name,
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        grid.len(),
        config.log_file.display()
    );

    let mut writer = LogWriter::create(&config.log_file).await?;
    let progress = if no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(grid.len() as u64)
    };
    progress.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} {msg}",
    )?);

    for point in grid {
        progress.set_message(format!(
            "threads={} size={} iterations={}",
            point.threads, point.size, point.iterations
        ));

        let started = Instant::now();
        let output = Command::new(&config.binary)
            .arg(point.size.to_string())
            .arg(point.iterations.to_string())
            .arg(point.threads.to_string())
            .envs(config.settings.env.clone().unwrap_or_default())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ProcessLaunchError {
                binary: config.binary.display().to_string(),
                source,
            })?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        // a failed run is still timed and logged; only the launch itself is
        // fatal
        if !output.status.success() {
            warn!(
                "{} exited with {} for threads={} size={} iterations={}",
                config.binary.display(),
                output.status,
                point.threads,
                point.size,
                point.iterations
            );
        }
        debug!(
            "threads={} size={} iterations={} elapsed={elapsed_secs}s stdout={}B stderr={}B",
            point.threads,
            point.size,
            point.iterations,
            output.stdout.len(),
            output.stderr.len()
        );

        writer.append(&RunRecord { point, elapsed_secs }).await?;
        progress.inc(1);
    }

    progress.finish_and_clear();
    println!("Log written to {}", writer.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::{config::Settings, grid::StepRange, report::parse_log};

    use super::*;

    fn test_config(binary: &str, log_file: std::path::PathBuf) -> Config {
        Config {
            name: "smoke".to_owned(),
            binary: binary.into(),
            log_file,
            thread_counts: vec![0, 2],
            sizes: StepRange {
                start: 100,
                stop: 201,
                step: 100,
            },
            iterations: StepRange {
                start: 10,
                stop: 11,
                step: 10,
            },
            settings: Settings::default(),
        }
    }

    #[tokio::test]
    async fn sweep_logs_one_record_per_cell_in_grid_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("true", dir.path().join("output.txt"));
        config.validate().unwrap();

        run_sweep(config.clone(), true).await.unwrap();

        let raw = tokio::fs::read_to_string(&config.log_file).await.unwrap();
        let records = parse_log(&raw).unwrap();
        let grid = enumerate_grid(&config.thread_counts, config.sizes, config.iterations);
        assert_eq!(records.len(), grid.len());
        for (record, point) in records.iter().zip(&grid) {
            assert_eq!(record.point, *point);
            assert!(record.elapsed_secs >= 0.0);
        }
    }

    #[tokio::test]
    async fn missing_binary_aborts_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(
            "/nonexistent/not-a-benchmark",
            dir.path().join("output.txt"),
        );

        let err = run_sweep(config, true).await.unwrap_err();
        assert!(err.downcast_ref::<ProcessLaunchError>().is_some());
    }

    #[tokio::test]
    async fn failing_binary_is_still_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("false", dir.path().join("output.txt"));

        run_sweep(config.clone(), true).await.unwrap();

        let raw = tokio::fs::read_to_string(&config.log_file).await.unwrap();
        let records = parse_log(&raw).unwrap();
        assert_eq!(records.len(), 4);
    }
}
