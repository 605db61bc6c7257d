// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::debug;

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all environment variables, keyed by lowercase name with the
    /// prefix removed.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();

        for (key, value) in env::vars() {
            if let Some(ref prefix) = self.prefix {
                if let Some(trimmed_key) = key.strip_prefix(prefix.as_str()) {
                    config.insert(trimmed_key.trim_start_matches('_').to_lowercase(), value);
                }
            } else {
                config.insert(key.to_lowercase(), value);
            }
        }

        Ok(config)
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Load variables from a `.env` file into the process environment.
///
/// Variables already set in the environment win. A missing file is not an
/// error; returns whether a file was read.
pub fn load_dotenv(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded environment file");
            Ok(true)
        }
        Err(err) if err.not_found() => {
            debug!(path = %path.display(), "no environment file, using process environment");
            Ok(false)
        }
        Err(err) => Err(ConfigError::LoadError(format!(
            "{}: {}",
            path.display(),
            err
        ))),
    }
}
