use serde::Serialize;

use crate::{bias::PerfBias, error::BiasError, linux::cpu::WriteSummary};

/// `Report` is the outcome of a completed run.
/// Per-core failures are already logged by the time a report exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Report {
    pub bias: PerfBias,
    #[serde(flatten)]
    pub summary: WriteSummary,
}

impl Report {
    /// `render` formats the single confirmation line printed on stdout.
    pub fn render(&self, json: bool) -> Result<String, BiasError> {
        if json {
            return Ok(serde_json::to_string(self)?);
        }
        Ok(format!(
            "Successfully set performance bias to {} for all CPUs",
            self.bias
        ))
    }
}
