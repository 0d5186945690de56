use std::{collections::HashMap, path::PathBuf};

use eyre::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::grid::StepRange;

/// Sweep configuration, loaded from `config.yaml`. Every parameter of the
/// sweep lives here; nothing is hardcoded in the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    /// The benchmark binary, invoked as `<binary> <size> <iterations> <threads>`.
    pub binary: PathBuf,
    pub log_file: PathBuf,
    /// Explicit, ordered list. Zero is a legal thread count; whether the
    /// sweep starts at 0 is the operator's call, not ours.
    pub thread_counts: Vec<u32>,
    pub sizes: StepRange,
    pub iterations: StepRange,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Extra environment for the child process.
    pub env: Option<HashMap<String, String>>,
    pub chart_title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.thread_counts.is_empty() {
            bail!("thread_counts must not be empty");
        }
        self.sizes.validate("sizes")?;
        self.iterations.validate("iterations")?;
        if self.sizes.start == 0 {
            bail!("sizes.start must be greater than zero");
        }
        if self.iterations.start == 0 {
            bail!("iterations.start must be greater than zero");
        }
        Ok(())
    }
}
