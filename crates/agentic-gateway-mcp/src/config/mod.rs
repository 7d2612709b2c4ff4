//! Configuration loading and resolution.

use std::time::Duration;

use agentic_gateway::JobManagerConfig;

/// Resolved runtime configuration for the gateway server.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum concurrent non-terminal jobs.
    pub max_jobs: usize,
    /// Time-to-live for job records.
    pub job_ttl: Duration,
    /// Constant poll hint stamped on job handles.
    pub poll_after: Duration,
    /// Publish server metadata to the registry on startup.
    pub advertise: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let defaults = JobManagerConfig::default();
        Self {
            max_jobs: defaults.max_jobs,
            job_ttl: defaults.job_ttl,
            poll_after: defaults.poll_after,
            advertise: false,
        }
    }
}

impl GatewayConfig {
    pub fn job_manager_config(&self) -> JobManagerConfig {
        JobManagerConfig {
            max_jobs: self.max_jobs,
            job_ttl: self.job_ttl,
            poll_after: self.poll_after,
        }
    }
}

/// Resolve configuration: CLI flags win over environment variables, which
/// win over defaults.
pub fn resolve_config(
    max_jobs: Option<usize>,
    job_ttl_secs: Option<u64>,
    advertise: bool,
) -> GatewayConfig {
    let mut config = GatewayConfig::default();

    if let Some(n) = max_jobs.or_else(|| env_parse("GATEWAY_MAX_JOBS")) {
        config.max_jobs = n;
    }
    if let Some(secs) = job_ttl_secs.or_else(|| env_parse("GATEWAY_JOB_TTL_SECS")) {
        config.job_ttl = Duration::from_secs(secs);
    }
    if let Some(ms) = env_parse::<u64>("GATEWAY_POLL_AFTER_MS") {
        config.poll_after = Duration::from_millis(ms);
    }
    config.advertise = advertise || std::env::var("GATEWAY_ADVERTISE").is_ok();

    config
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}
