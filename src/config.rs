//! Server configuration, read from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::Schema;
use crate::error::{AclError, Result};
use crate::options::GuardOptions;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DOCACL_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: String,
    pub bind: String,
    pub schema: Schema,
    pub guard: GuardOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: "docacl_data".into(),
            bind: "0.0.0.0:3000".into(),
            schema: Schema::default(),
            guard: GuardOptions::default(),
        }
    }
}

impl Config {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| AclError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| AclError::Config(format!("{}: {}", path.display(), e)))?;
        Config::from_json(&s)
    }

    /// File named by `DOCACL_CONFIG`, or defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Config::from_file(path),
            Err(_) => Ok(Config::default()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
