use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use crate::common::constants::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_TRANSIENT_RETRY_DELAY_MS,
};
use crate::config::ConfigError;

/// Backoff curve and limits for one poll invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollConfig {
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Fixed pause before the single retry of a transient lookup failure
    pub transient_retry_delay: Duration,
    /// Overall time budget; `None` polls until the status is terminal
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            transient_retry_delay: Duration::from_millis(DEFAULT_TRANSIENT_RETRY_DELAY_MS),
            deadline: None,
        }
    }
}

impl PollConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backoff_factor.is_finite() && self.backoff_factor > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "backoff_factor must be greater than 1, got {}",
                self.backoff_factor
            )));
        }
        if self.initial_delay.is_zero() || self.max_delay.is_zero() {
            return Err(ConfigError::Invalid("poll delays must be positive".to_string()));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::Invalid(format!(
                "max_delay ({:?}) is shorter than initial_delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid("deadline must be positive".to_string()));
        }
        Ok(())
    }
}

/// Exponentially growing, capped sequence of delay ceilings (millisecond resolution)
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    current_ms: u64,
    factor: f64,
    max_ms: u64,
}

impl BackoffSchedule {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            current_ms: config.initial_delay.as_millis() as u64,
            factor: config.backoff_factor,
            max_ms: config.max_delay.as_millis() as u64,
        }
    }

    /// Current magnitude, before the next advance
    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// `min(max, round(current * factor))`, which also becomes the new current magnitude
    pub fn advance(&mut self) -> Duration {
        let grown = (self.current_ms as f64 * self.factor).round() as u64;
        self.current_ms = grown.min(self.max_ms);
        Duration::from_millis(self.current_ms)
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.advance())
    }
}

/// Uniform draw from `[0, ceiling)`; a zero ceiling yields zero
pub fn sample_jitter<R: Rng + ?Sized>(ceiling: Duration, rng: &mut R) -> Duration {
    let ceiling_ms = ceiling.as_millis() as u64;
    if ceiling_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..ceiling_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_curve() {
        let mut schedule = BackoffSchedule::new(&PollConfig::default());
        assert_eq!(schedule.current(), Duration::from_millis(30_000));
        assert_eq!(schedule.advance(), Duration::from_millis(51_000));
        assert_eq!(schedule.advance(), Duration::from_millis(60_000));
        assert_eq!(schedule.advance(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_magnitudes_non_decreasing_and_capped() {
        let configs = [
            PollConfig::default(),
            PollConfig {
                initial_delay: Duration::from_millis(100),
                backoff_factor: 1.05,
                max_delay: Duration::from_millis(500),
                ..PollConfig::default()
            },
            PollConfig {
                initial_delay: Duration::from_millis(250),
                backoff_factor: 3.5,
                max_delay: Duration::from_secs(3600),
                ..PollConfig::default()
            },
        ];

        for config in configs {
            let mut previous = config.initial_delay;
            for magnitude in BackoffSchedule::new(&config).take(200) {
                assert!(magnitude >= previous, "{:?} < {:?}", magnitude, previous);
                assert!(magnitude <= config.max_delay);
                previous = magnitude;
            }
            assert_eq!(previous, config.max_delay);
        }
    }

    #[test]
    fn test_jitter_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for ceiling_ms in [1u64, 2, 10, 999, 51_000, 60_000] {
            let ceiling = Duration::from_millis(ceiling_ms);
            for _ in 0..500 {
                let delay = sample_jitter(ceiling, &mut rng);
                assert!(delay < ceiling);
            }
        }
        assert_eq!(sample_jitter(Duration::ZERO, &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_validate() {
        assert!(PollConfig::default().validate().is_ok());

        let flat = PollConfig {
            backoff_factor: 1.0,
            ..PollConfig::default()
        };
        assert!(flat.validate().is_err());

        let inverted = PollConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(5),
            ..PollConfig::default()
        };
        assert!(inverted.validate().is_err());

        let zero = PollConfig {
            initial_delay: Duration::ZERO,
            ..PollConfig::default()
        };
        assert!(zero.validate().is_err());

        assert!(PollConfig::default().with_deadline(Duration::ZERO).validate().is_err());
    }
}
