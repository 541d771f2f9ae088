use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const INPUT_BATCH_SIZE_ENV: &str = "PULLGRAPH_INPUT_BATCH_SIZE";
pub const MAX_SORT_ROWS_ENV: &str = "PULLGRAPH_MAX_SORT_ROWS";

const DEFAULT_INPUT_BATCH_SIZE: usize = 1024;

/// Runtime knobs for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Rows requested from the row source per batch. Throughput only.
    pub input_batch_size: usize,
    /// Upper bound on rows buffered by a single Sort.
    pub max_sort_rows: Option<usize>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            input_batch_size: DEFAULT_INPUT_BATCH_SIZE,
            max_sort_rows: None,
        }
    }
}

impl ExecConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Defaults overridden by `PULLGRAPH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(INPUT_BATCH_SIZE_ENV) {
            config.input_batch_size = parse_count(INPUT_BATCH_SIZE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_SORT_ROWS_ENV).filter(|s| !s.trim().is_empty()) {
            config.max_sort_rows = Some(parse_count(MAX_SORT_ROWS_ENV, &raw)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "input_batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{name} must be a non-negative integer, got {raw:?}")))
}
