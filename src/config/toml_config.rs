use crate::adapters::{HttpOracle, SwetestOracle};
use crate::core::engine::EngineOptions;
use crate::domain::model::{Alphabet, MissingLongitudePolicy, MissingZonePolicy};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_positive_number, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_INVOCATION_TIMEOUT_SECONDS: u64 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("environment placeholder pattern"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub alphabet: Alphabet,
    #[serde(default)]
    pub missing_zone: MissingZonePolicy,
    #[serde(default)]
    pub missing_longitude: MissingLongitudePolicy,
    pub equation_of_time: Option<bool>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            missing_zone: MissingZonePolicy::default(),
            missing_longitude: MissingLongitudePolicy::default(),
            equation_of_time: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleKind {
    Swetest,
    Http,
    #[default]
    MeanSun,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub kind: OracleKind,
    pub executable: Option<String>,
    pub ephemeris_dir: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub invocation_timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub cache_capacity: Option<usize>,
}

impl OracleConfig {
    /// Bound on one complete oracle query.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    /// Bound on a single encoded request within a query.
    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(
            self.invocation_timeout_seconds
                .unwrap_or(DEFAULT_INVOCATION_TIMEOUT_SECONDS),
        )
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(0)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML after substituting `${VAR}` placeholders from the environment.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| EngineError::config("toml_parsing", format!("TOML parsing error: {}", e)))
    }

    /// Unknown variables are left as written and rejected by validation.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn alphabet(&self) -> Alphabet {
        self.engine.alphabet
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            missing_zone: self.engine.missing_zone,
            missing_longitude: self.engine.missing_longitude,
            equation_of_time: self.engine.equation_of_time.unwrap_or(true),
            oracle_timeout: self.oracle.timeout(),
            retry_attempts: self.oracle.retry_attempts(),
            retry_delay: self.oracle.retry_delay(),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        let oracle = &self.oracle;

        if let Some(seconds) = oracle.timeout_seconds {
            validate_positive_number("oracle.timeout_seconds", seconds, 1)?;
        }
        if let Some(seconds) = oracle.invocation_timeout_seconds {
            validate_positive_number("oracle.invocation_timeout_seconds", seconds, 1)?;
        }

        // Building the oracle performs the startup checks (paths, URL).
        let worst_case = match oracle.kind {
            OracleKind::Swetest => SwetestOracle::from_config(oracle)?.worst_case_duration(),
            OracleKind::Http => HttpOracle::from_config(oracle)?.worst_case_duration(),
            OracleKind::MeanSun => return Ok(()),
        };

        // The query bound must outlast every attempt, or the attempt list is lost.
        if oracle.timeout() <= worst_case {
            return Err(EngineError::config(
                "oracle.timeout_seconds",
                format!(
                    "query timeout {:?} must exceed {:?}, the time all encoded attempts may take \
                     at {:?} each",
                    oracle.timeout(),
                    worst_case,
                    oracle.invocation_timeout()
                ),
            ));
        }

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
