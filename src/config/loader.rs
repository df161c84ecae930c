//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are merged in order:
//! built-in defaults, an optional configuration file, then environment
//! variables (`PIPELINE__INPUT__POLL_INTERVAL_MS=250`).

use super::error::{ConfigResult, ConfigurationError};
use super::PipelineConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "PIPELINE";

/// Explicit configuration file path override
pub const CONFIG_PATH_VAR: &str = "PIPELINE_CONFIG_PATH";

const DEFAULT_CONFIG_CANDIDATES: [&str; 3] = [
    "config/pipeline.toml",
    "config/pipeline.yaml",
    "config/pipeline.json",
];

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: PipelineConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with file discovery and environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let explicit = env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        match explicit {
            Some(path) => Self::load_from_path(&path),
            None => {
                let discovered = DEFAULT_CONFIG_CANDIDATES
                    .iter()
                    .map(PathBuf::from)
                    .find(|candidate| candidate.is_file());
                Self::load_from_sources(discovered.as_deref(), ENV_PREFIX)
            }
        }
    }

    /// Load configuration from a specific file that must exist
    pub fn load_from_path(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        if !path.is_file() {
            return Err(ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_from_sources(Some(path), ENV_PREFIX)
    }

    /// Merge defaults, an optional file and environment variables with the given prefix
    pub fn load_from_sources(
        path: Option<&Path>,
        env_prefix: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        debug!(
            environment = %environment,
            file = ?path.map(|p| p.display().to_string()),
            "Loading pipeline configuration"
        );

        let defaults = Config::try_from(&PipelineConfig::default()).map_err(source_error)?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder
            .build()
            .map_err(source_error)?
            .try_deserialize()
            .map_err(|e| ConfigurationError::DeserializationError {
                error: e.to_string(),
            })?;

        config.validate()?;

        info!(
            environment = %environment,
            poll_interval_ms = config.input.poll_interval_ms,
            channel_capacity = config.events.channel_capacity,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_file: path.map(Path::to_path_buf),
        }))
    }

    /// Wrap an in-memory configuration, validating it first
    pub fn from_config(config: PipelineConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_file: None,
        }))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Detect the runtime environment from the usual variables
    pub fn detect_environment() -> String {
        env::var("PIPELINE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}

fn source_error(e: config::ConfigError) -> ConfigurationError {
    ConfigurationError::SourceError {
        error: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults_without_file() {
        let manager = ConfigManager::load_from_sources(None, "PIPELINE_TEST_NOFILE").unwrap();
        assert_eq!(manager.config(), &PipelineConfig::default());
        assert!(manager.source_file().is_none());
    }

    #[test]
    fn test_load_from_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[input]\npoll_interval_ms = 250\ncancellation_ttl_seconds = 5\n\n[pipeline]\nstep_delay_scale = 0.0"
        )
        .unwrap();

        let manager = ConfigManager::load_from_path(file.path()).unwrap();
        let config = manager.config();
        assert_eq!(config.input.poll_interval_ms, 250);
        assert_eq!(config.input.cancellation_ttl_seconds, 5);
        assert_eq!(config.pipeline.step_delay_scale, 0.0);
        // untouched sections keep defaults
        assert_eq!(config.input.submitted_value_ttl_seconds, 300);
        assert_eq!(config.events.channel_capacity, 1000);
    }

    #[test]
    fn test_environment_overrides_file() {
        std::env::set_var("PIPELINE_TEST_ENV__EVENTS__CHANNEL_CAPACITY", "64");
        let manager = ConfigManager::load_from_sources(None, "PIPELINE_TEST_ENV").unwrap();
        std::env::remove_var("PIPELINE_TEST_ENV__EVENTS__CHANNEL_CAPACITY");

        assert_eq!(manager.config().events.channel_capacity, 64);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigManager::load_from_path(Path::new("/nonexistent/pipeline.toml"));
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[events]\nchannel_capacity = 0").unwrap();

        let result = ConfigManager::load_from_path(file.path());
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }
}
