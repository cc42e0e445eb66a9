//! Per-level validation policy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValidationError;

/// Countdown used when a level does not set one.
pub const DEFAULT_COUNTDOWN: u8 = 3;

/// Largest countdown that still renders as one digit.
pub const MAX_COUNTDOWN: u8 = 9;

/// Validation policy run for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationType {
    /// Always passes
    #[default]
    None,
    /// Stateless proof-of-work challenge
    ProofOfWork,
}

impl ValidationType {
    /// Configuration name of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ProofOfWork => "pow",
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "pow" => Ok(Self::ProofOfWork),
            _ => Err(ValidationError::UnknownValidationType),
        }
    }
}

/// Single-digit client hint. Always within `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Countdown(u8);

impl Countdown {
    /// Returns `None` when `value` does not fit in one digit.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value > MAX_COUNTDOWN {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Numeric value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The value as an ASCII digit.
    #[must_use]
    pub const fn as_ascii_digit(self) -> u8 {
        b'0' + self.0
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self(DEFAULT_COUNTDOWN)
    }
}

/// Policy of one level. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConfig {
    /// Lifetime of tokens issued at this level
    pub duration: Duration,
    /// Validator run for this level
    pub validation_type: ValidationType,
    /// Client hint rendered in response bodies
    pub countdown: Countdown,
}

impl LevelConfig {
    /// Creates a level with the default countdown.
    #[must_use]
    pub fn new(duration: Duration, validation_type: ValidationType) -> Self {
        Self {
            duration,
            validation_type,
            countdown: Countdown::default(),
        }
    }

    /// Replaces the countdown.
    #[must_use]
    pub fn with_countdown(mut self, countdown: Countdown) -> Self {
        self.countdown = countdown;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_type_parse() {
        assert_eq!("none".parse(), Ok(ValidationType::None));
        assert_eq!("pow".parse(), Ok(ValidationType::ProofOfWork));
        assert_eq!(
            "captcha".parse::<ValidationType>(),
            Err(ValidationError::UnknownValidationType)
        );
        assert_eq!(
            "POW".parse::<ValidationType>(),
            Err(ValidationError::UnknownValidationType)
        );
    }

    #[test]
    fn test_validation_type_display_round_trips() {
        for ty in [ValidationType::None, ValidationType::ProofOfWork] {
            assert_eq!(ty.to_string().parse(), Ok(ty));
        }
    }

    #[test]
    fn test_countdown_bounds() {
        assert_eq!(Countdown::new(0).map(Countdown::get), Some(0));
        assert_eq!(Countdown::new(9).map(Countdown::as_ascii_digit), Some(b'9'));
        assert_eq!(Countdown::new(10), None);
        assert_eq!(Countdown::default().get(), DEFAULT_COUNTDOWN);
    }

    #[test]
    fn test_level_config_builder() {
        let level = LevelConfig::new(Duration::from_secs(60), ValidationType::ProofOfWork)
            .with_countdown(Countdown::new(5).unwrap());
        assert_eq!(level.countdown.get(), 5);
        assert_eq!(level.validation_type, ValidationType::ProofOfWork);
    }
}
