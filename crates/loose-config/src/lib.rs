//! Configuration system for loose association runs.
//!
//! Load the fragmentation, the constraints and the privacy degrees from TOML
//! or YAML files, validate them, and resolve attribute names against a table.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use loose_config::{RetryMode, RunConfig};
//!
//! let config = RunConfig::from_toml_str(r#"
//!     fragments = [["name", "zip"], ["disease"]]
//!     constraints = [["name", "disease"]]
//!     k_list = [2, 3]
//!     skip_probability = 0.2
//!     retries = 10
//!     retry_mode = "parallel"
//! "#).unwrap();
//!
//! assert_eq!(config.fragments.len(), 2);
//! assert_eq!(config.retry_mode, RetryMode::Parallel);
//! assert!(config.validate().is_ok());
//! ```
//!
//! Build configuration in code:
//!
//! ```
//! use loose_config::RunConfig;
//!
//! let config = RunConfig::new()
//!     .with_fragment(["name"])
//!     .with_fragment(["disease"])
//!     .with_constraint(["name", "disease"])
//!     .with_k_list([2, 2]);
//!
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashSet;
use std::path::Path;

use loose_core::Table;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_retries() -> usize {
    1
}

/// Main run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RunConfig {
    /// Attribute names of each fragment. Fragments must be disjoint.
    #[serde(default)]
    pub fragments: Vec<Vec<String>>,

    /// Attribute names of each constraint.
    #[serde(default)]
    pub constraints: Vec<Vec<String>>,

    /// Privacy degree (minimum group size) of each fragment.
    #[serde(default)]
    pub k_list: Vec<usize>,

    /// Probability of skipping a candidate group during placement.
    #[serde(default)]
    pub skip_probability: f64,

    /// Maximum number of attempts.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Random seed for reproducible results.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// How retry attempts are scheduled.
    #[serde(default)]
    pub retry_mode: RetryMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            constraints: Vec::new(),
            k_list: Vec::new(),
            skip_probability: 0.0,
            retries: default_retries(),
            random_seed: None,
            retry_mode: RetryMode::default(),
        }
    }
}

impl RunConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Adds a fragment.
    pub fn with_fragment<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments
            .push(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a constraint.
    pub fn with_constraint<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints
            .push(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the per-fragment privacy degrees.
    pub fn with_k_list(mut self, k_list: impl IntoIterator<Item = usize>) -> Self {
        self.k_list = k_list.into_iter().collect();
        self
    }

    /// Sets the candidate skip probability.
    pub fn with_skip_probability(mut self, skip_probability: f64) -> Self {
        self.skip_probability = skip_probability;
        self
    }

    /// Sets the maximum number of attempts.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets how retry attempts are scheduled.
    pub fn with_retry_mode(mut self, retry_mode: RetryMode) -> Self {
        self.retry_mode = retry_mode;
        self
    }

    /// Checks the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fragments.is_empty() {
            return Err(ConfigError::Invalid("at least one fragment is required".into()));
        }

        let mut seen = HashSet::new();
        for (id, fragment) in self.fragments.iter().enumerate() {
            if fragment.is_empty() {
                return Err(ConfigError::Invalid(format!("fragment {id} is empty")));
            }
            for attribute in fragment {
                if !seen.insert(attribute.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "attribute `{attribute}` appears in more than one fragment"
                    )));
                }
            }
        }

        if self.k_list.len() != self.fragments.len() {
            return Err(ConfigError::Invalid(format!(
                "k_list has {} entries but there are {} fragments",
                self.k_list.len(),
                self.fragments.len()
            )));
        }
        if let Some(id) = self.k_list.iter().position(|&k| k == 0) {
            return Err(ConfigError::Invalid(format!(
                "k for fragment {id} must be positive"
            )));
        }

        if !(0.0..1.0).contains(&self.skip_probability) {
            return Err(ConfigError::Invalid(format!(
                "skip_probability must be in [0, 1), got {}",
                self.skip_probability
            )));
        }

        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be positive".into()));
        }

        Ok(())
    }

    /// Validates the configuration and resolves attribute names against `table`.
    pub fn resolve<T: Table>(&self, table: &T) -> Result<ResolvedConfig, ConfigError> {
        self.validate()?;

        let lookup = |names: &Vec<String>| -> Result<Vec<usize>, ConfigError> {
            names
                .iter()
                .map(|name| {
                    table.attribute_index(name).ok_or_else(|| {
                        ConfigError::Invalid(format!("unknown attribute `{name}`"))
                    })
                })
                .collect()
        };

        Ok(ResolvedConfig {
            fragments: self.fragments.iter().map(lookup).collect::<Result<_, _>>()?,
            constraints: self
                .constraints
                .iter()
                .map(lookup)
                .collect::<Result<_, _>>()?,
            k_list: self.k_list.clone(),
            skip_probability: self.skip_probability,
            retries: self.retries,
            random_seed: self.random_seed,
            retry_mode: self.retry_mode,
        })
    }
}

/// Scheduling of retry attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// One attempt after another on the calling thread.
    #[default]
    Sequential,

    /// Independent attempts on the rayon thread pool.
    Parallel,
}

/// Configuration with attribute names resolved to column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Column indices of each fragment.
    pub fragments: Vec<Vec<usize>>,
    /// Column indices of each constraint.
    pub constraints: Vec<Vec<usize>>,
    /// Privacy degree of each fragment.
    pub k_list: Vec<usize>,
    /// Candidate skip probability.
    pub skip_probability: f64,
    /// Maximum number of attempts.
    pub retries: usize,
    /// Random seed, if fixed.
    pub random_seed: Option<u64>,
    /// Retry scheduling.
    pub retry_mode: RetryMode,
}
