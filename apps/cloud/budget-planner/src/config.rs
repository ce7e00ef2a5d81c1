//! Configuration for the budget planner

use core_config::{Environment, FromEnv};
use domain_budget::CatalogConfig;
use domain_budget::rates::RateConfig;
use eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub catalog: CatalogConfig,
    pub rates: RateConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            environment: Environment::from_env(),
            catalog: CatalogConfig::from_env()?,
            rates: RateConfig::from_env()?,
        })
    }
}
