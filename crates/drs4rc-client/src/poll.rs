use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{ClientError, Result};

/// Bounded polling schedule.
///
/// The first probe runs immediately. Between probes the client sleeps for
/// `interval`, multiplied by `backoff` after every miss and capped at
/// `max_interval`. Polling gives up with [`ClientError::Timeout`] once
/// `deadline` has elapsed.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Initial delay between probes.
    pub interval: Duration,
    /// Upper bound on the delay between probes.
    pub max_interval: Duration,
    /// Growth factor applied to the delay after each miss (values below 1.0
    /// are treated as 1.0).
    pub backoff: f64,
    /// Total time to keep polling.
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            backoff: 1.5,
            deadline: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    /// Delay to use after a miss that followed `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let factor = self.backoff.max(1.0);
        if factor == 1.0 {
            return current.min(self.max_interval);
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Run `probe` on `config`'s schedule until it yields a value.
pub fn poll_until<T>(
    config: &PollConfig,
    mut probe: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let start = Instant::now();
    let mut interval = config.interval;
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);
        if let Some(value) = probe()? {
            trace!(attempts, "poll condition met");
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= config.deadline {
            return Err(ClientError::Timeout(config.deadline));
        }

        std::thread::sleep(interval.min(config.deadline - elapsed));
        interval = config.next_interval(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            backoff: 2.0,
            deadline: Duration::from_secs(5),
        }
    }

    #[test]
    fn returns_first_hit() {
        let mut calls = 0;
        let value = poll_until(&fast(), || {
            calls += 1;
            Ok((calls == 3).then_some(calls * 10))
        })
        .unwrap();
        assert_eq!(value, 30);
        assert_eq!(calls, 3);
    }

    #[test]
    fn immediate_hit_does_not_sleep() {
        let config = PollConfig {
            interval: Duration::from_secs(60),
            ..fast()
        };
        let start = Instant::now();
        assert_eq!(poll_until(&config, || Ok(Some(1))).unwrap(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn gives_up_at_deadline() {
        let config = PollConfig {
            deadline: Duration::from_millis(20),
            ..fast()
        };
        let result: Result<()> = poll_until(&config, || Ok(None));
        assert!(matches!(result, Err(ClientError::Timeout(d)) if d == Duration::from_millis(20)));
    }

    #[test]
    fn probe_error_stops_polling() {
        let mut calls = 0;
        let result: Result<()> = poll_until(&fast(), || {
            calls += 1;
            Err(ClientError::Disconnected("gone".to_string()))
        });
        assert!(matches!(result, Err(ClientError::Disconnected(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn backoff_is_capped() {
        let config = fast();
        let mut interval = config.interval;
        for _ in 0..10 {
            interval = config.next_interval(interval);
        }
        assert_eq!(interval, config.max_interval);
    }

    #[test]
    fn backoff_below_one_keeps_interval() {
        let config = PollConfig {
            backoff: 0.1,
            ..fast()
        };
        assert_eq!(config.next_interval(config.interval), config.interval);
    }
}
