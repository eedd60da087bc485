use crate::error::MetricsError;
use async_trait::async_trait;
use std::time::Duration;

/// External source of the summary statistic reported after a live session.
///
/// The value is advisory and never feeds back into routing.
#[async_trait]
pub trait SessionMetrics: Send + Sync {
    /// Average session duration observed over `runtime`.
    async fn average_session(&self, runtime: Duration) -> Result<f64, MetricsError>;
}
