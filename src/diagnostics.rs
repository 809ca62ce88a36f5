use std::fmt::Display;

/// Collects failures of best-effort steps so they can be logged and echoed
/// back to the caller without aborting the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: &str, detail: impl Display) {
        tracing::warn!("{} skipped: {}", step, detail);
        self.warnings.push(format!("{}: {}", step, detail));
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
