use std::time::Duration;

/// How long a like mutation may take before it's treated as failed
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, bon::Builder)]
pub struct ReconcilerConfig {
    /// Deadline for a single like mutation; expiry rolls the toggle back
    #[builder(default = DEFAULT_REMOTE_TIMEOUT)]
    pub remote_timeout: Duration,

    /// Re-fetch posts and likes after every confirmed toggle
    ///
    /// Skipped while any other toggle is still in flight.
    #[builder(default)]
    pub resync_after_toggle: bool,

    /// Retries of transient failures during (re)loading
    #[builder(default = 3)]
    pub load_retries: usize,

    /// Initial delay between (re)loading retries
    #[builder(default = Duration::from_millis(500))]
    pub load_retry_delay: Duration,

    /// Buffered user-facing notices per subscriber
    #[builder(default = 16)]
    pub notice_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
