// Adapters layer: concrete solar-position oracles and calendar sources behind the domain ports.

pub mod cache;
pub mod calendar;
pub mod http;
pub mod mean_sun;
pub mod parse;
pub mod swetest;

use crate::config::toml_config::{OracleConfig, OracleKind};
use crate::domain::model::{snippet, OracleTrace, SolarPosition, SolarReading};
use crate::domain::ports::SolarPositionProvider;
use crate::utils::error::{EngineError, Result};
use chrono::{DateTime, Utc};

pub use cache::CachedSolarProvider;
pub use calendar::StaticCalendar;
pub use http::{HttpEncoding, HttpOracle};
pub use mean_sun::MeanSunProvider;
pub use swetest::{SwetestFormat, SwetestOracle};

/// Oracle output quoted per attempt in failure messages.
pub const ERROR_SNIPPET_CHARS: usize = 400;

/// Julian Day of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian Day number (UT) of an instant, shared by the oracles that speak JD.
pub fn julian_day(utc: DateTime<Utc>) -> f64 {
    utc.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD
}

/// One encoded request sent to an oracle and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleAttempt {
    pub invocation: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The oracle answered but no longitude could be read from the text.
    Unparsed(String),
    /// The oracle could not be invoked or reported failure.
    Failed(String),
}

impl OracleAttempt {
    pub fn unparsed(invocation: impl Into<String>, output: &str) -> Self {
        Self {
            invocation: invocation.into(),
            outcome: AttemptOutcome::Unparsed(output.to_string()),
        }
    }

    pub fn failed(invocation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            outcome: AttemptOutcome::Failed(reason.into()),
        }
    }
}

/// Reads a longitude out of `output`, or `None` when every parser gives up.
pub fn reading_from_output(
    utc: DateTime<Utc>,
    invocation: &str,
    output: &str,
) -> Option<SolarReading> {
    let (longitude, parser) = parse::parse_longitude(output)?;
    let position = SolarPosition::new(longitude, utc).ok()?;
    tracing::debug!(
        "Parsed solar longitude {:.6}° with {} from `{}`",
        longitude,
        parser.name(),
        invocation
    );
    Some(SolarReading {
        position,
        trace: OracleTrace::new(invocation, output),
    })
}

/// Error listing every attempt with a bounded snippet of its output.
pub fn exhausted(oracle: &str, attempts: &[OracleAttempt]) -> EngineError {
    let mut lines = vec![format!(
        "{}: sun longitude could not be obtained after {} attempt(s)",
        oracle,
        attempts.len()
    )];
    for (i, attempt) in attempts.iter().enumerate() {
        lines.push(format!("--- Attempt {} ---", i + 1));
        lines.push(attempt.invocation.clone());
        match &attempt.outcome {
            AttemptOutcome::Unparsed(output) => {
                lines.push(format!("unparseable output: {}", snippet(output, ERROR_SNIPPET_CHARS)))
            }
            AttemptOutcome::Failed(reason) => {
                lines.push(format!("failed: {}", snippet(reason, ERROR_SNIPPET_CHARS)))
            }
        }
    }
    EngineError::oracle(lines.join("\n"))
}

/// Builds the configured oracle, wrapped in a cache when one is enabled.
pub fn provider_from_config(config: &OracleConfig) -> Result<Box<dyn SolarPositionProvider>> {
    let provider: Box<dyn SolarPositionProvider> = match config.kind {
        OracleKind::Swetest => Box::new(SwetestOracle::from_config(config)?),
        OracleKind::Http => Box::new(HttpOracle::from_config(config)?),
        OracleKind::MeanSun => Box::new(MeanSunProvider),
    };

    let capacity = config.cache_capacity();
    if capacity == 0 {
        return Ok(provider);
    }
    Ok(Box::new(CachedSolarProvider::new(provider, capacity)))
}
