//! Session configuration, read from the environment with defaults.

use std::time::Duration;

use thiserror::Error;
use till_notifications::SUCCESS_DISMISS;
use till_observability::LogFormat;

pub const SUCCESS_DISMISS_VAR: &str = "TILL_SUCCESS_DISMISS_SECS";
pub const INVALID_INPUT_DISMISS_VAR: &str = "TILL_INVALID_INPUT_DISMISS_SECS";
pub const LOG_FORMAT_VAR: &str = "TILL_LOG_FORMAT";

const DEFAULT_INVALID_INPUT_DISMISS: Duration = Duration::from_secs(8);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Auto-dismiss delay for success notices.
    pub success_dismiss: Duration,
    /// Auto-dismiss delay for invalid-input notices the session raises itself.
    /// `None` keeps them until dismissed.
    pub invalid_input_dismiss: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            success_dismiss: SUCCESS_DISMISS,
            invalid_input_dismiss: Some(DEFAULT_INVALID_INPUT_DISMISS),
            log_format: LogFormat::Json,
        }
    }
}

impl SessionConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(SUCCESS_DISMISS_VAR) {
            config.success_dismiss = parse_seconds(SUCCESS_DISMISS_VAR, &value)?;
        }

        if let Some(value) = lookup(INVALID_INPUT_DISMISS_VAR) {
            let delay = parse_seconds(INVALID_INPUT_DISMISS_VAR, &value)?;
            config.invalid_input_dismiss = (!delay.is_zero()).then_some(delay);
        }

        if let Some(value) = lookup(LOG_FORMAT_VAR) {
            config.log_format = value.parse::<LogFormat>().map_err(|err| ConfigError::Invalid {
                var: LOG_FORMAT_VAR,
                value: value.clone(),
                reason: format!("{err}"),
            })?;
        }

        Ok(config)
    }
}

fn parse_seconds(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.success_dismiss, Duration::from_secs(5));
        assert_eq!(config.invalid_input_dismiss, Some(Duration::from_secs(8)));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn values_are_read_from_the_lookup() {
        let config = SessionConfig::from_lookup(lookup(&[
            (SUCCESS_DISMISS_VAR, "2"),
            (INVALID_INPUT_DISMISS_VAR, "0"),
            (LOG_FORMAT_VAR, "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.success_dismiss, Duration::from_secs(2));
        assert_eq!(config.invalid_input_dismiss, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = SessionConfig::from_lookup(lookup(&[(SUCCESS_DISMISS_VAR, "soon")])).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, SUCCESS_DISMISS_VAR);
                assert_eq!(value, "soon");
            }
        }

        let err = SessionConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).unwrap_err();
        assert!(err.to_string().contains(LOG_FORMAT_VAR));
    }
}
