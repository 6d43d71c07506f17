//! Process configuration.
//!
//! Everything is read from `VRO_*` environment variables layered over the
//! defaults below; there is no configuration file.

use std::{collections::HashMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VRO";

/// What a build step does when a single file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the whole run at the first failing file.
    Abort,
    /// Log the failure and carry on with the next file.
    Skip,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Listening port for `serve`.
    pub port: u16,

    /// Reload the layout before every render.
    pub debug: bool,

    /// Source root holding `content/` and `static/`.
    pub path: PathBuf,

    /// Destination directory for `build`.
    pub out: PathBuf,

    /// Serve raw Markdown when the request path ends in `.md`.
    pub serve_source: bool,

    /// Failure policy for copying the static subtree.
    pub static_errors: ErrorPolicy,

    /// Failure policy for rendering the content subtree.
    pub content_errors: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7000,
            debug: true,
            path: PathBuf::from("./contents"),
            out: PathBuf::from("./out"),
            serve_source: false,
            static_errors: ErrorPolicy::Abort,
            content_errors: ErrorPolicy::Skip,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load configuration from an explicit set of variables.
    ///
    /// Keys are full variable names, e.g. `VRO_PORT`.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("port", i64::from(defaults.port))?
            .set_default("debug", defaults.debug)?
            .set_default("path", defaults.path.to_string_lossy().into_owned())?
            .set_default("out", defaults.out.to_string_lossy().into_owned())?
            .set_default("serve_source", defaults.serve_source)?
            .set_default("static_errors", defaults.static_errors.to_string())?
            .set_default("content_errors", defaults.content_errors.to_string())?
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(vars))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "VRO_PATH",
                message: "source path cannot be empty".to_string(),
            });
        }
        if self.out.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "VRO_OUT",
                message: "output path cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(HashMap::new()).expect("load config");

        assert_eq!(config, Config::default());
        assert_eq!(config.port, 7000);
        assert!(config.debug);
        assert_eq!(config.path, PathBuf::from("./contents"));
        assert!(!config.serve_source);
        assert_eq!(config.static_errors, ErrorPolicy::Abort);
        assert_eq!(config.content_errors, ErrorPolicy::Skip);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("VRO_PORT", "8080"),
            ("VRO_DEBUG", "false"),
            ("VRO_PATH", "/srv/site"),
            ("VRO_OUT", "/srv/out"),
            ("VRO_SERVE_SOURCE", "true"),
            ("VRO_CONTENT_ERRORS", "abort"),
            ("VRO_STATIC_ERRORS", "skip"),
        ]))
        .expect("load config");

        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.path, PathBuf::from("/srv/site"));
        assert_eq!(config.out, PathBuf::from("/srv/out"));
        assert!(config.serve_source);
        assert_eq!(config.content_errors, ErrorPolicy::Abort);
        assert_eq!(config.static_errors, ErrorPolicy::Skip);
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        let config = Config::from_vars(vars(&[("OTHER_PORT", "1")])).expect("load config");
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_bad_port() {
        let result = Config::from_vars(vars(&[("VRO_PORT", "not-a-port")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_policy() {
        let result = Config::from_vars(vars(&[("VRO_CONTENT_ERRORS", "sometimes")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = Config::from_vars(vars(&[("VRO_PATH", "")])).unwrap_err();
        assert!(err.to_string().contains("VRO_PATH"));
    }
}
