use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::grid::ParameterPoint;

/// One timed observation: the grid cell plus the wall-clock duration of the
/// child process, launch overhead included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRecord {
    pub point: ParameterPoint,
    pub elapsed_secs: f64,
}

impl RunRecord {
    /// The two-line log representation. The double space before
    /// `Iterations:` is part of the format.
    pub fn log_lines(&self) -> String {
        format!(
            "Thread count: {} Size: {}  Iterations: {}\nTime (s): {}\n",
            self.point.threads, self.point.size, self.point.iterations, self.elapsed_secs
        )
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Create log file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Append to log file {path}: {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Append-only writer for the sweep log. Creation truncates any previous
/// log; every append is flushed so a crash mid-sweep keeps the records
/// written so far.
pub struct LogWriter {
    file: File,
    path: PathBuf,
}

impl LogWriter {
    pub async fn create(path: &Path) -> Result<Self, LogError> {
        let file = File::create(path).await.map_err(|source| LogError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub async fn append(&mut self, record: &RunRecord) -> Result<(), LogError> {
        self.file
            .write_all(record.log_lines().as_bytes())
            .await
            .map_err(|source| LogError::Append {
                path: self.path.clone(),
                source,
            })?;
        self.file
            .flush()
            .await
            .map_err(|source| LogError::Append {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_match_fixed_format() {
        let record = RunRecord {
            point: ParameterPoint {
                threads: 2,
                size: 101,
                iterations: 500,
            },
            elapsed_secs: 0.1234,
        };
        assert_eq!(
            record.log_lines(),
            "Thread count: 2 Size: 101  Iterations: 500\nTime (s): 0.1234\n"
        );
    }

    #[tokio::test]
    async fn writer_truncates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        tokio::fs::write(&path, "stale contents\n").await.unwrap();

        let mut writer = LogWriter::create(&path).await.unwrap();
        for size in [101, 201] {
            writer
                .append(&RunRecord {
                    point: ParameterPoint {
                        threads: 2,
                        size,
                        iterations: 500,
                    },
                    elapsed_secs: 0.5,
                })
                .await
                .unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            contents,
            "Thread count: 2 Size: 101  Iterations: 500\nTime (s): 0.5\n\
             Thread count: 2 Size: 201  Iterations: 500\nTime (s): 0.5\n"
        );
    }

    #[tokio::test]
    async fn create_in_missing_directory_fails() {
        let result = LogWriter::create(Path::new("/nonexistent-dir/output.txt")).await;
        assert!(matches!(result, Err(LogError::Create { .. })));
    }
}
