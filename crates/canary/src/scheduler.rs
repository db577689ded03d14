//! Probe injection timing.
//!
//! Injection follows a Poisson arrival process so probes cannot be
//! anticipated, subject to a hard minimum interval so a run of unlucky
//! draws cannot burst-probe an agent.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Mean probe arrivals per hour
    pub lambda_per_hour: f64,
    /// Hard floor between probes for one agent
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lambda_per_hour: 0.2,
            min_interval: Duration::seconds(60),
        }
    }
}

/// Decides when an agent is due for a probe.
#[derive(Debug, Clone, Default)]
pub struct ProbeScheduler {
    config: SchedulerConfig,
}

impl ProbeScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Probability that at least one Poisson arrival occurred in `elapsed`.
    pub fn injection_probability(&self, elapsed: Duration) -> f64 {
        let hours = elapsed.num_milliseconds().max(0) as f64 / 3_600_000.0;
        1.0 - (-self.config.lambda_per_hour * hours).exp()
    }

    /// Whether to inject a probe now.
    ///
    /// An agent with no probe history is always probed: there is no
    /// baseline to trust yet.
    pub fn should_inject(&self, last_probe_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let last = match last_probe_at {
            Some(at) => at,
            None => return true,
        };

        let elapsed = now - last;
        if elapsed < self.config.min_interval {
            return false;
        }

        rand::thread_rng().gen::<f64>() < self.injection_probability(elapsed)
    }
}
