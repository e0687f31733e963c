//! Runtime configuration for a pivot run.

use crate::cancel::CancellationToken;
use crate::grouping::MAX_BREAKOUTS;
#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;
use crate::rewrite::DEFAULT_GROUPING_COLUMN;

/// Planner and merger settings.
#[derive(Clone, Debug)]
pub struct PivotConfig {
    /// Name of the synthetic grouping expression and its output column.
    pub grouping_column: String,
    /// Upper bound on the base query's breakout count. Values above
    /// [`MAX_BREAKOUTS`] are clamped to it.
    pub max_breakouts: usize,
    /// Emit a `debug!` event every N merged rows. `None` disables it.
    pub progress_log_interval: Option<u64>,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            grouping_column: DEFAULT_GROUPING_COLUMN.to_string(),
            max_breakouts: MAX_BREAKOUTS,
            progress_log_interval: None,
        }
    }
}

impl PivotConfig {
    pub(crate) fn breakout_limit(&self) -> usize {
        self.max_breakouts.min(MAX_BREAKOUTS)
    }
}

/// Optional per-run context supplied by the caller.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    pub cancel: CancellationToken,
    #[cfg(feature = "metrics")]
    pub metrics: Option<MetricsCollector>,
    pub config: PivotConfig,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PivotConfig) -> Self {
        self.config = config;
        self
    }
}
