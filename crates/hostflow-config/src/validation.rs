use hostflow_utils::error::ConfigError;

use crate::model::{Config, MAX_GRACE_PERIOD_MS, MAX_RETRY_TIMEOUT_SCALE, MIN_TAIL_BYTES};

impl Config {
    /// Reject values the runner or the recovery chain cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host_binary.trim().is_empty() {
            return Err(invalid("host.binary", "", "must not be empty"));
        }

        let grace_ms = self.grace_period.as_millis();
        if grace_ms > u128::from(MAX_GRACE_PERIOD_MS) {
            return Err(invalid(
                "host.grace_period_ms",
                &grace_ms.to_string(),
                &format!("must be at most {MAX_GRACE_PERIOD_MS}"),
            ));
        }

        if self.tail_bytes < MIN_TAIL_BYTES {
            return Err(invalid(
                "host.tail_bytes",
                &self.tail_bytes.to_string(),
                &format!("must be at least {MIN_TAIL_BYTES}"),
            ));
        }

        if !(1.0..=MAX_RETRY_TIMEOUT_SCALE).contains(&self.retry_timeout_scale) {
            return Err(invalid(
                "retry_timeout_scale",
                &self.retry_timeout_scale.to_string(),
                &format!("must be a number from 1.0 to {MAX_RETRY_TIMEOUT_SCALE}"),
            ));
        }

        if let Some(workspace) = &self.default_workspace
            && workspace.trim().is_empty()
        {
            return Err(invalid("routing.default_workspace", workspace, "must not be blank"));
        }

        Ok(())
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { key, .. } => key,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_grace_period_upper_bound() {
        let config = Config {
            grace_period: Duration::from_millis(MAX_GRACE_PERIOD_MS + 1),
            ..Config::default()
        };
        assert_eq!(key_of(config.validate().unwrap_err()), "host.grace_period_ms");

        let at_bound = Config {
            grace_period: Duration::from_millis(MAX_GRACE_PERIOD_MS),
            ..Config::default()
        };
        at_bound.validate().unwrap();
    }

    #[test]
    fn test_zero_grace_period_is_allowed() {
        let config = Config {
            grace_period: Duration::ZERO,
            ..Config::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_tail_bytes_lower_bound() {
        let config = Config {
            tail_bytes: MIN_TAIL_BYTES - 1,
            ..Config::default()
        };
        assert_eq!(key_of(config.validate().unwrap_err()), "host.tail_bytes");
    }

    #[test]
    fn test_retry_scale_outside_bounds_is_rejected() {
        for scale in [0.5, -1.0, f64::NAN, f64::INFINITY, MAX_RETRY_TIMEOUT_SCALE + 1.0, 1e300] {
            let config = Config {
                retry_timeout_scale: scale,
                ..Config::default()
            };
            assert_eq!(key_of(config.validate().unwrap_err()), "retry_timeout_scale");
        }
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let config = Config {
            host_binary: "  ".to_string(),
            ..Config::default()
        };
        assert_eq!(key_of(config.validate().unwrap_err()), "host.binary");

        let config = Config {
            default_workspace: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(key_of(config.validate().unwrap_err()), "routing.default_workspace");
    }
}
