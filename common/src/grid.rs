use eyre::{Result, bail};
use itertools::iproduct;
use serde::{Deserialize, Serialize};

/// Half-open range with a stride: `start`, `start + step`, ... while `< stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub start: u64,
    pub stop: u64,
    pub step: u64,
}

impl StepRange {
    pub fn values(&self) -> impl Iterator<Item = u64> + Clone + use<> {
        (self.start..self.stop).step_by(self.step.max(1) as usize)
    }

    pub fn len(&self) -> usize {
        if self.start >= self.stop || self.step == 0 {
            return 0;
        }
        ((self.stop - self.start - 1) / self.step + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.step == 0 {
            bail!("{name}: step must be greater than zero");
        }
        if self.start >= self.stop {
            bail!(
                "{name}: range {}..{} is empty, nothing to sweep",
                self.start,
                self.stop
            );
        }
        Ok(())
    }
}

/// One grid cell of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub threads: u32,
    pub size: u64,
    pub iterations: u64,
}

/// Enumerates the full grid in nested order: thread, then size, then
/// iteration count. The log file carries records in exactly this order.
pub fn enumerate_grid(
    thread_counts: &[u32],
    sizes: StepRange,
    iterations: StepRange,
) -> Vec<ParameterPoint> {
    iproduct!(thread_counts.iter().copied(), sizes.values(), iterations.values())
        .map(|(threads, size, iterations)| ParameterPoint {
            threads,
            size,
            iterations,
        })
        .collect()
}
