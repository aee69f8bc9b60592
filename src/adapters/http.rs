//! Solar longitude from a remote ephemeris service over HTTP.

use crate::adapters::{
    exhausted, julian_day, reading_from_output, OracleAttempt, ERROR_SNIPPET_CHARS,
};
use crate::config::toml_config::OracleConfig;
use crate::domain::model::{snippet, SolarReading};
use crate::domain::ports::SolarPositionProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_required_field, validate_resolved, validate_url};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// How the instant is put on the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HttpEncoding {
    /// `?body=sun&utc=2024-02-04T01:00:00Z`
    IsoInstant,
    /// `?body=sun&jd=2460344.541667`
    JulianDay,
}

impl HttpEncoding {
    pub fn query_pairs(&self, utc: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let instant = match self {
            Self::IsoInstant => ("utc", utc.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::JulianDay => ("jd", format!("{:.6}", julian_day(utc))),
        };
        vec![("body", "sun".to_string()), instant]
    }
}

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    endpoint: Url,
    encodings: Vec<HttpEncoding>,
    request_timeout: Duration,
}

impl HttpOracle {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            encodings: vec![HttpEncoding::IsoInstant, HttpEncoding::JulianDay],
            request_timeout: super::swetest::DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let endpoint = validate_required_field("oracle.endpoint", &config.endpoint)?;
        validate_resolved("oracle.endpoint", endpoint)?;
        let endpoint = validate_url("oracle.endpoint", endpoint)?;
        Ok(Self::new(endpoint).with_request_timeout(config.invocation_timeout()))
    }

    pub fn with_encodings(mut self, encodings: Vec<HttpEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn worst_case_duration(&self) -> Duration {
        self.request_timeout
            .saturating_mul(self.encodings.len().try_into().unwrap_or(u32::MAX))
    }

    pub fn request_url(&self, utc: DateTime<Utc>, encoding: HttpEncoding) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(encoding.query_pairs(utc));
        url
    }

    async fn fetch(&self, url: Url) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("could not read body: {}", e))?;

        if !status.is_success() {
            return Err(format!(
                "HTTP {}: {}",
                status,
                snippet(&body, ERROR_SNIPPET_CHARS)
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl SolarPositionProvider for HttpOracle {
    fn engine_id(&self) -> &str {
        "http"
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        let mut attempts = Vec::with_capacity(self.encodings.len());

        for encoding in &self.encodings {
            let url = self.request_url(utc, *encoding);
            let invocation = format!("GET {}", url);
            tracing::debug!("Querying oracle: {}", invocation);

            match self.fetch(url).await {
                Ok(body) => match reading_from_output(utc, &invocation, &body) {
                    Some(reading) => return Ok(reading),
                    None => attempts.push(OracleAttempt::unparsed(invocation, &body)),
                },
                Err(reason) => {
                    tracing::debug!("Oracle request failed: {}", reason);
                    attempts.push(OracleAttempt::failed(invocation, reason));
                }
            }
        }

        Err(exhausted("http", &attempts))
    }
}
