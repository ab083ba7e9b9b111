use camino::{Utf8Path, Utf8PathBuf};
use hostflow_utils::error::ConfigError;
use hostflow_utils::paths;
use std::time::Duration;

use crate::model::{CliArgs, Config, ConfigFile, ConfigSource};
use crate::profile::ProfileName;

impl Config {
    /// Discover and load configuration with precedence CLI > config file > defaults.
    ///
    /// The config file is `--config` when given (and must exist), else
    /// `<hostflow home>/config.toml` when present.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        Self::discover_with_default(cli_args, paths::default_config_path())
    }

    /// Path-driven variant of [`discover`](Self::discover) used by tests.
    pub fn discover_with_default(
        cli_args: &CliArgs,
        default_path: Option<Utf8PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config_path = match &cli_args.config_path {
            Some(explicit) if !explicit.is_file() => {
                return Err(ConfigError::NotFound {
                    path: explicit.to_string(),
                });
            }
            Some(explicit) => Some(explicit.clone()),
            None => default_path.filter(|path| path.is_file()),
        };

        let mut config = Config::default();

        if let Some(path) = config_path {
            tracing::debug!(path = %path, "loading configuration file");
            let file = Self::load_config_file(&path)?;
            config.apply_file(file, &path)?;
            config.config_path = Some(path);
        }

        config.apply_cli(cli_args)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without applying it.
    pub fn load_config_file(path: &Utf8Path) -> Result<ConfigFile, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
            path: path.to_string(),
            reason: e.message().to_string(),
        })
    }

    fn apply_file(&mut self, file: ConfigFile, path: &Utf8Path) -> Result<(), ConfigError> {
        let source = || ConfigSource::ConfigFile(path.to_path_buf());

        if let Some(host) = file.host {
            if let Some(binary) = host.binary {
                self.host_binary = binary;
                self.source_attribution.insert("host_binary", source());
            }
            if let Some(ms) = host.grace_period_ms {
                self.grace_period = Duration::from_millis(ms);
                self.source_attribution.insert("grace_period_ms", source());
            }
            if let Some(bytes) = host.tail_bytes {
                self.tail_bytes = bytes;
                self.source_attribution.insert("tail_bytes", source());
            }
        }

        if let Some(routing) = file.routing {
            if let Some(workspace) = routing.default_workspace {
                self.default_workspace = Some(workspace);
                self.source_attribution.insert("default_workspace", source());
            }
            if let Some(state_path) = routing.state_path {
                self.state_path = Some(state_path);
                self.source_attribution.insert("state_path", source());
            }
        }

        if let Some(defaults) = file.defaults {
            if let Some(profile) = defaults.profile {
                self.profile = profile.parse::<ProfileName>()?;
                self.source_attribution.insert("profile", source());
            }
            if let Some(scale) = defaults.retry_timeout_scale {
                self.retry_timeout_scale = scale;
                self.source_attribution.insert("retry_timeout_scale", source());
            }
        }

        Ok(())
    }

    fn apply_cli(&mut self, cli_args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(profile) = &cli_args.profile {
            self.profile = profile.parse::<ProfileName>()?;
            self.source_attribution.insert("profile", ConfigSource::Cli);
        }
        if let Some(scale) = cli_args.retry_timeout_scale {
            // Flag values below 1.0 are clamped; config file values are rejected.
            if scale < 1.0 {
                tracing::warn!(scale, "retry timeout scale below 1.0 clamped to 1.0");
            }
            self.retry_timeout_scale = scale.max(1.0);
            self.source_attribution
                .insert("retry_timeout_scale", ConfigSource::Cli);
        }
        Ok(())
    }

    /// State file location: `[routing] state_path`, else the default under the hostflow home.
    pub fn resolved_state_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => paths::default_state_path()
                .ok_or(ConfigError::NoDefaultLocation { what: "state file" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_GRACE_PERIOD_MS, DEFAULT_HOST_BINARY, DEFAULT_TAIL_BYTES};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = Config::discover_with_default(&CliArgs::default(), None).unwrap();
        assert_eq!(config.host_binary, DEFAULT_HOST_BINARY);
        assert_eq!(config.grace_period, Duration::from_millis(DEFAULT_GRACE_PERIOD_MS));
        assert_eq!(config.tail_bytes, DEFAULT_TAIL_BYTES);
        assert_eq!(config.profile, ProfileName::Normal);
        assert!(config.config_path.is_none());
        assert_eq!(config.source_of("profile"), Some(&ConfigSource::Defaults));
    }

    #[test]
    fn test_missing_default_file_is_fine() {
        let dir = TempDir::new().unwrap();
        let absent = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        let config = Config::discover_with_default(&CliArgs::default(), Some(absent)).unwrap();
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let cli = CliArgs {
            config_path: Some(Utf8PathBuf::from("/nonexistent/hostflow.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_with_default(&cli, None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_file_values_are_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[host]
binary = "/opt/rp/rp-cli"
grace_period_ms = 500
tail_bytes = 1024

[routing]
default_workspace = "GitHub"
state_path = "/tmp/hostflow-state.json"

[defaults]
profile = "deep"
retry_timeout_scale = 2.0
"#,
        );

        let config = Config::discover_with_default(&CliArgs::default(), Some(path.clone())).unwrap();
        assert_eq!(config.host_binary, "/opt/rp/rp-cli");
        assert_eq!(config.grace_period, Duration::from_millis(500));
        assert_eq!(config.tail_bytes, 1024);
        assert_eq!(config.default_workspace.as_deref(), Some("GitHub"));
        assert_eq!(
            config.resolved_state_path().unwrap(),
            Utf8PathBuf::from("/tmp/hostflow-state.json")
        );
        assert_eq!(config.profile, ProfileName::Deep);
        assert!((config.retry_timeout_scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            config.source_of("profile"),
            Some(&ConfigSource::ConfigFile(path.clone()))
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[defaults]\nprofile = \"deep\"\n");
        let cli = CliArgs {
            config_path: Some(path),
            profile: Some("fast".to_string()),
            retry_timeout_scale: Some(3.0),
        };

        let config = Config::discover_with_default(&cli, None).unwrap();
        assert_eq!(config.profile, ProfileName::Fast);
        assert_eq!(config.source_of("profile"), Some(&ConfigSource::Cli));
        assert!((config.retry_timeout_scale - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cli_retry_scale_is_clamped() {
        let cli = CliArgs {
            retry_timeout_scale: Some(0.25),
            ..CliArgs::default()
        };
        let config = Config::discover_with_default(&cli, None).unwrap();
        assert!((config.retry_timeout_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cli_retry_scale_above_bound_is_rejected() {
        let cli = CliArgs {
            retry_timeout_scale: Some(1e300),
            ..CliArgs::default()
        };
        let err = Config::discover_with_default(&cli, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "retry_timeout_scale"));
    }

    #[test]
    fn test_unknown_profile_in_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[defaults]\nprofile = \"ludicrous\"\n");
        let err = Config::discover_with_default(&CliArgs::default(), Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[host]\nbinnary = \"rp-cli\"\n");
        let err = Config::discover_with_default(&CliArgs::default(), Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile { .. }));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[host\nbinary = ");
        let err = Config::discover_with_default(&CliArgs::default(), Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile { .. }));
    }

    #[test]
    fn test_default_state_path_follows_home() {
        let home = hostflow_utils::paths::with_isolated_home();
        let config = Config::default();
        assert_eq!(
            config.resolved_state_path().unwrap(),
            home.path().join("state.json")
        );
    }
}
