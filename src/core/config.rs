use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;

use crate::core::error::ConfigError;

pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Deserialize, Clone)]
pub struct Args {
    pub base_url: String,
    pub storage_dir: PathBuf,
    pub log_level: String,
    pub user_agent: String,
}

impl Args {
    /// Reads `STOREFRONT_*` environment variables over the built-in defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    pub(crate) fn load(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("base_url", "http://localhost:8080/api")?
            .set_default("storage_dir", ".storefront")?
            .set_default("log_level", "info")?
            .set_default(
                "user_agent",
                concat!("storefront/", env!("CARGO_PKG_VERSION")),
            )?
            .add_source(environment)
            .build()?;

        Ok(config.try_deserialize::<Args>()?)
    }
}
