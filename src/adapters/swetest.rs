//! Solar longitude from the Swiss Ephemeris `swetest` command-line tool.

use crate::adapters::{exhausted, reading_from_output, OracleAttempt};
use crate::config::toml_config::OracleConfig;
use crate::domain::model::{snippet, SolarReading};
use crate::domain::ports::SolarPositionProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_existing_dir, validate_existing_file, validate_required_field, validate_resolved,
};
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Output format flag requested from `swetest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwetestFormat {
    /// `-fl`: ecliptic longitude in decimal degrees.
    DecimalLongitude,
    /// `-fPl`: planet name followed by the longitude.
    NamedLongitude,
}

impl SwetestFormat {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::DecimalLongitude => "-fl",
            Self::NamedLongitude => "-fPl",
        }
    }
}

/// Arguments asking for the Sun's position at `utc` (ephemeris path excluded).
pub fn encode_args(utc: DateTime<Utc>, format: SwetestFormat) -> Vec<String> {
    let time = if utc.hour() == 0 && utc.minute() == 0 && utc.second() == 0 {
        "-ut0".to_string()
    } else {
        format!("-ut{}", utc.format("%H:%M:%S"))
    };

    vec![
        format!("-b{}", utc.format("%d.%m.%Y")),
        time,
        "-p0".to_string(),
        format.flag().to_string(),
        "-g,".to_string(),
        "-head".to_string(),
        "-eswe".to_string(),
    ]
}

#[derive(Debug, Clone)]
pub struct SwetestOracle {
    executable: PathBuf,
    ephemeris_dir: PathBuf,
    formats: Vec<SwetestFormat>,
    invocation_timeout: Duration,
}

impl SwetestOracle {
    pub fn new(executable: impl Into<PathBuf>, ephemeris_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ephemeris_dir: ephemeris_dir.into(),
            formats: vec![SwetestFormat::DecimalLongitude, SwetestFormat::NamedLongitude],
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    /// Fails with a configuration error unless both the executable and the
    /// ephemeris directory exist.
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let executable = validate_required_field("oracle.executable", &config.executable)?;
        let ephemeris_dir = validate_required_field("oracle.ephemeris_dir", &config.ephemeris_dir)?;
        validate_resolved("oracle.executable", executable)?;
        validate_resolved("oracle.ephemeris_dir", ephemeris_dir)?;
        validate_existing_file("oracle.executable", executable)?;
        validate_existing_dir("oracle.ephemeris_dir", ephemeris_dir)?;

        Ok(Self::new(executable, ephemeris_dir)
            .with_invocation_timeout(config.invocation_timeout()))
    }

    pub fn with_formats(mut self, formats: Vec<SwetestFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Longest a query can take when every invocation runs to its timeout.
    pub fn worst_case_duration(&self) -> Duration {
        self.invocation_timeout
            .saturating_mul(self.formats.len().try_into().unwrap_or(u32::MAX))
    }

    fn full_args(&self, utc: DateTime<Utc>, format: SwetestFormat) -> Vec<String> {
        let mut args = vec![format!("-edir{}", self.ephemeris_dir.display())];
        args.extend(encode_args(utc, format));
        args
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.executable.display(), args.join(" "))
    }

    /// Output text of a successful run, or why the run failed.
    async fn run(&self, args: &[String]) -> std::result::Result<String, String> {
        let child = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("could not launch: {}", e))?;

        let output = tokio::time::timeout(self.invocation_timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {:?}", self.invocation_timeout))?
            .map_err(|e| format!("could not collect output: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let detail = if stderr.is_empty() { &stdout } else { &stderr };
            return Err(format!(
                "exited with {}: {}",
                output.status,
                snippet(detail, crate::adapters::ERROR_SNIPPET_CHARS)
            ));
        }

        Ok(if stdout.is_empty() { stderr } else { stdout })
    }
}

#[async_trait]
impl SolarPositionProvider for SwetestOracle {
    fn engine_id(&self) -> &str {
        "swetest"
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        let mut attempts = Vec::with_capacity(self.formats.len());

        for format in &self.formats {
            let args = self.full_args(utc, *format);
            let invocation = self.describe(&args);
            tracing::debug!("Invoking oracle: {}", invocation);

            match self.run(&args).await {
                Ok(output) => match reading_from_output(utc, &invocation, &output) {
                    Some(reading) => return Ok(reading),
                    None => {
                        tracing::debug!("No longitude in output of `{}`", invocation);
                        attempts.push(OracleAttempt::unparsed(invocation, &output));
                    }
                },
                Err(reason) => {
                    tracing::debug!("Oracle invocation failed: {}", reason);
                    attempts.push(OracleAttempt::failed(invocation, reason));
                }
            }
        }

        Err(exhausted("swetest", &attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_args() {
        let utc = Utc.with_ymd_and_hms(2024, 2, 4, 1, 5, 9).unwrap();
        assert_eq!(
            encode_args(utc, SwetestFormat::DecimalLongitude),
            vec!["-b04.02.2024", "-ut01:05:09", "-p0", "-fl", "-g,", "-head", "-eswe"]
        );
        assert_eq!(encode_args(utc, SwetestFormat::NamedLongitude)[3], "-fPl");
    }

    #[test]
    fn test_encode_args_midnight() {
        let utc = Utc.with_ymd_and_hms(1999, 12, 31, 0, 0, 0).unwrap();
        let args = encode_args(utc, SwetestFormat::DecimalLongitude);
        assert_eq!(args[0], "-b31.12.1999");
        assert_eq!(args[1], "-ut0");
    }

    #[test]
    fn test_description_includes_ephemeris_dir() {
        let oracle = SwetestOracle::new("/opt/sweph/swetest", "/opt/sweph/ephe");
        let utc = Utc.with_ymd_and_hms(2024, 2, 4, 1, 0, 0).unwrap();
        let args = oracle.full_args(utc, SwetestFormat::DecimalLongitude);
        assert_eq!(
            oracle.describe(&args),
            "/opt/sweph/swetest -edir/opt/sweph/ephe -b04.02.2024 -ut01:00:00 -p0 -fl -g, -head -eswe"
        );
    }

    #[tokio::test]
    async fn test_missing_executable_reports_every_attempt() {
        let oracle = SwetestOracle::new("/nonexistent/swetest", "/nonexistent/ephe");
        let utc = Utc.with_ymd_and_hms(2024, 2, 4, 1, 0, 0).unwrap();
        let message = oracle.query(utc).await.unwrap_err().to_string();

        assert!(message.contains("after 2 attempt(s)"));
        assert!(message.contains("-fl -g,"));
        assert!(message.contains("-fPl -g,"));
        assert!(message.contains("could not launch"));
    }
}
