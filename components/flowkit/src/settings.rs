use std::time::Duration;

pub const DEFAULT_SEAL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tuning knobs of a [`crate::Flowkit`] instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowkitSettings {
    /// Delay between two transaction result polls while waiting for a seal.
    pub seal_poll_interval: Duration,
    /// Upper bound on seal waiting, unbounded when `None`.
    pub seal_timeout: Option<Duration>,
}

impl Default for FlowkitSettings {
    fn default() -> Self {
        FlowkitSettings {
            seal_poll_interval: DEFAULT_SEAL_POLL_INTERVAL,
            seal_timeout: None,
        }
    }
}
