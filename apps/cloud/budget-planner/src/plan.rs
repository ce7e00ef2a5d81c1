//! Plan files: the list of selections to estimate

use domain_budget::Selection;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::Path;

/// `{ "items": [ { "provider": ..., "service_type": ..., "name": ... }, ... ] }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Plan {
    pub items: Vec<Selection>,
}

impl Plan {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid plan JSON")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("cannot read plan {}", path.display()))?;
        Self::from_json_str(&raw).wrap_err_with(|| format!("in {}", path.display()))
    }
}
