use std::time::Duration;

/// Named options consumed by the core (§6). The engine binary's CLI layer
/// (`clap`, derive + env) overlays these defaults with flags and
/// environment variables; the core itself only knows about this flat
/// struct, not where a value came from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub heartbeat_interval: Duration,
    pub stale_timeout: Duration,
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub max_frame_size_bytes: usize,
    pub default_task_timeout: Duration,
    pub outbound_queue_size: usize,
    /// `None` means unbounded fan-out within a phase (the spec's default).
    pub dispatch_concurrency: Option<usize>,
    pub safe_mode_default: bool,
}

impl EngineConfig {
    pub fn ping_period(&self) -> Duration {
        // 9/10 of pong_wait, matching the reader/writer liveness contract.
        self.pong_wait.mul_f64(0.9)
    }

    pub fn timeout_grace(&self) -> Duration {
        Duration::from_secs(10)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_timeout: Duration::from_secs(120),
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
            max_frame_size_bytes: bas_wire::MAX_FRAME_SIZE_BYTES,
            default_task_timeout: Duration::from_secs(300),
            outbound_queue_size: 256,
            dispatch_concurrency: None,
            safe_mode_default: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_period_is_nine_tenths_of_pong_wait() {
        let config = EngineConfig::default();
        assert_eq!(config.ping_period(), Duration::from_secs(54));
    }
}
