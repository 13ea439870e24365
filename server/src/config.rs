use crate::error::ConfigError;
use shared::{AI_MOVE_MAX_MS, AI_MOVE_MIN_MS, COUNTDOWN_INTERVAL_MS, COUNTDOWN_START};
use std::time::Duration;

/// Timing knobs for one race server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceConfig {
    /// First value shown when the countdown begins
    pub countdown_start: u32,
    /// Delay between countdown ticks
    pub countdown_interval: Duration,
    /// Shortest delay between AI ticks
    pub ai_move_min: Duration,
    /// Longest delay between AI ticks
    pub ai_move_max: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            countdown_start: COUNTDOWN_START,
            countdown_interval: Duration::from_millis(COUNTDOWN_INTERVAL_MS),
            ai_move_min: Duration::from_millis(AI_MOVE_MIN_MS),
            ai_move_max: Duration::from_millis(AI_MOVE_MAX_MS),
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_start == 0 {
            return Err(ConfigError::ZeroCountdown);
        }
        if self.countdown_interval.is_zero() {
            return Err(ConfigError::ZeroCountdownInterval);
        }
        if self.ai_move_min.is_zero() {
            return Err(ConfigError::ZeroAiInterval);
        }
        if self.ai_move_min > self.ai_move_max {
            return Err(ConfigError::InvertedAiInterval {
                min: self.ai_move_min,
                max: self.ai_move_max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_default_config_matches_protocol_constants() {
        let config = RaceConfig::default();
        assert_eq!(config.countdown_start, 3);
        assert_eq!(config.countdown_interval, Duration::from_millis(1000));
        assert_eq!(config.ai_move_min, Duration::from_millis(800));
        assert_eq!(config.ai_move_max, Duration::from_millis(1500));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = RaceConfig::default();

        let cases = vec![
            (
                RaceConfig {
                    countdown_start: 0,
                    ..base
                },
                ConfigError::ZeroCountdown,
            ),
            (
                RaceConfig {
                    countdown_interval: Duration::ZERO,
                    ..base
                },
                ConfigError::ZeroCountdownInterval,
            ),
            (
                RaceConfig {
                    ai_move_min: Duration::ZERO,
                    ..base
                },
                ConfigError::ZeroAiInterval,
            ),
            (
                RaceConfig {
                    ai_move_min: Duration::from_millis(2000),
                    ..base
                },
                ConfigError::InvertedAiInterval {
                    min: Duration::from_millis(2000),
                    max: Duration::from_millis(1500),
                },
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_equal_ai_bounds_are_valid() {
        let config = RaceConfig {
            ai_move_min: Duration::from_millis(900),
            ai_move_max: Duration::from_millis(900),
            ..RaceConfig::default()
        };
        assert_ok!(config.validate());
    }
}
