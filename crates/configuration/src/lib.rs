use crate::error::ConfigError;
use config::{Environment, File, FileFormat};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{Config, DatabaseSettings, LogFormat, LoggingSettings, ServerSettings};

/// Prefix for environment overrides, e.g. `SPELLAPI__DATABASE__URI`.
pub const ENV_PREFIX: &str = "SPELLAPI";

/// Loads the application configuration from the `config.toml` file.
///
/// The file is optional; every key can also come from the environment, which
/// takes precedence over the file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads configuration from `path`, layered under environment overrides.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

impl Config {
    /// Parses configuration from TOML text without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.uri.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.uri must not be empty".to_string(),
            ));
        }
        if self.server.socket_addr().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "server.host '{}' is not a valid IP address",
                self.server.host
            )));
        }
        Ok(())
    }
}
