use bazi_engine::adapters::{provider_from_config, HttpOracle, SwetestOracle};
use bazi_engine::config::{EngineConfig, OracleKind};
use bazi_engine::domain::ports::SolarPositionProvider;
use bazi_engine::utils::validation::Validate;
use bazi_engine::{BirthMoment, EngineError, PillarEngine, StaticCalendar};
use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use url::Url;

#[cfg(unix)]
fn fake_swetest(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn test_swetest_oracle_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let utc = Utc.with_ymd_and_hms(2024, 2, 4, 1, 0, 0).unwrap();

    // Named format only: the decimal request prints a banner without a number.
    let picky = fake_swetest(
        dir.path(),
        "picky-swetest",
        r#"case "$*" in
  *-fPl*) echo "Sun,314.6902" ;;
  *) echo "ephemeris banner only" ;;
esac"#,
    );
    let oracle = SwetestOracle::new(&picky, dir.path());
    let reading = oracle.query(utc).await.unwrap();
    assert!((reading.position.longitude() - 314.6902).abs() < 1e-9);
    assert!(reading.trace.invocation.contains("-fPl"));
    assert!(reading.trace.invocation.contains("-b04.02.2024 -ut01:00:00"));

    // Nothing parseable at all: both invocations are reported.
    let broken = fake_swetest(dir.path(), "broken-swetest", "echo 'SwissEph file not found in path'");
    let err = SwetestOracle::new(&broken, dir.path())
        .query(utc)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, EngineError::ExternalOracle { .. }));
    assert!(message.contains("after 2 attempt(s)"));
    assert!(message.contains(" -fl "));
    assert!(message.contains(" -fPl "));
    assert!(message.contains("SwissEph file not found"));

    // Non-zero exit status is a failed attempt.
    let failing = fake_swetest(dir.path(), "failing-swetest", "echo 'illegal option' >&2\nexit 1");
    let err = SwetestOracle::new(&failing, dir.path())
        .query(utc)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("illegal option"));

    // A hung process is killed after the invocation timeout.
    let hung = fake_swetest(dir.path(), "hung-swetest", "sleep 30");
    let err = SwetestOracle::new(&hung, dir.path())
        .with_invocation_timeout(Duration::from_millis(100))
        .query(utc)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_swetest_config_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let exe = fake_swetest(dir.path(), "swetest", "echo '315.5000000'");

    let mut config_file = NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"
[engine]
alphabet = "hanja"

[oracle]
kind = "swetest"
executable = "{}"
ephemeris_dir = "{}"
cache_capacity = 4
"#,
        exe.display(),
        dir.path().display()
    )
    .unwrap();

    let config = EngineConfig::from_file(config_file.path()).unwrap();
    assert_eq!(config.oracle.kind, OracleKind::Swetest);
    assert!(config.validate().is_ok());

    let provider = provider_from_config(&config.oracle).unwrap();
    let engine = PillarEngine::with_options(
        provider,
        StaticCalendar::new(40, 0).unwrap(),
        config.engine_options(),
    );
    let moment = BirthMoment::new("2024-02-04T10:00:00")
        .with_tzid("Asia/Seoul")
        .with_longitude(126.978);

    let first = engine.calculate(&moment).await.unwrap();
    let second = engine.calculate(&moment).await.unwrap();

    assert_eq!(first.engine, "swetest");
    assert_eq!(first.report(config.alphabet()).month.stem, "丙");
    assert!(!first.diagnostics.oracle_cached);
    assert!(second.diagnostics.oracle_cached);
    assert_eq!(first.diagnostics.oracle_calls, 1);
    assert_eq!(second.diagnostics.oracle_calls, 0);
    assert_eq!(first.month, second.month);
}

#[cfg(unix)]
#[tokio::test]
async fn test_hung_swetest_reports_every_invocation_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let exe = fake_swetest(dir.path(), "swetest", "sleep 30");

    // Same ratio as the defaults (15 s against two 5 s invocations), scaled down.
    let config = EngineConfig::from_toml_str(&format!(
        r#"
[oracle]
kind = "swetest"
executable = "{}"
ephemeris_dir = "{}"
timeout_seconds = 3
invocation_timeout_seconds = 1
cache_capacity = 0
"#,
        exe.display(),
        dir.path().display()
    ))
    .unwrap();
    assert!(config.validate().is_ok());

    let provider = provider_from_config(&config.oracle).unwrap();
    let engine = PillarEngine::with_options(
        provider,
        StaticCalendar::new(40, 0).unwrap(),
        config.engine_options(),
    );
    let moment = BirthMoment::new("2024-02-04T10:00:00").with_offset_minutes(540);

    let err = engine.calculate(&moment).await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, EngineError::ExternalOracle { .. }));
    assert!(message.contains("after 2 attempt(s)"), "{}", message);
    assert!(message.contains(" -fl "), "{}", message);
    assert!(message.contains(" -fPl "), "{}", message);
    assert!(message.contains("timed out"), "{}", message);
}

#[cfg(unix)]
#[test]
fn test_query_timeout_not_above_attempts_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let exe = fake_swetest(dir.path(), "swetest", "sleep 30");

    let config = EngineConfig::from_toml_str(&format!(
        "[oracle]\nkind = \"swetest\"\nexecutable = \"{}\"\nephemeris_dir = \"{}\"\n\
         timeout_seconds = 2\ninvocation_timeout_seconds = 1\n",
        exe.display(),
        dir.path().display()
    ))
    .unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, EngineError::Configuration { ref field, .. } if field == "oracle.timeout_seconds"));
}

#[tokio::test]
async fn test_http_oracle_behind_engine() {
    let server = MockServer::start();
    let sun = server.mock(|when, then| {
        when.method(GET).path("/sun").query_param("body", "sun");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({ "longitude": 315.5, "body": "sun" }));
    });

    let oracle = HttpOracle::new(Url::parse(&server.url("/sun")).unwrap());
    let engine = PillarEngine::new(oracle, StaticCalendar::new(40, 0).unwrap());
    let moment = BirthMoment::new("2024-02-04T10:00:00")
        .with_offset_minutes(540)
        .with_longitude(126.978);

    let chart = engine.calculate(&moment).await.unwrap();

    sun.assert();
    assert_eq!(chart.engine, "http");
    assert_eq!(chart.diagnostics.solar_longitude, 315.5);
    assert!(chart.diagnostics.oracle_snippet.contains("315.5"));
}

#[tokio::test]
async fn test_http_oracle_outage_is_reported_with_requests() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sun");
        then.status(503).body("maintenance window");
    });

    let oracle = HttpOracle::new(Url::parse(&server.url("/sun")).unwrap());
    let engine = PillarEngine::new(oracle, StaticCalendar::new(40, 0).unwrap());
    let moment = BirthMoment::new("2024-02-04T10:00:00").with_offset_minutes(540);

    let err = engine.calculate(&moment).await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, EngineError::ExternalOracle { .. }));
    assert!(message.contains("503"));
    assert!(message.contains("maintenance window"));
    assert!(message.contains("utc=2024-02-04T01%3A00%3A00Z"));
}

#[test]
fn test_missing_swetest_paths_fail_at_startup() {
    let config = EngineConfig::from_toml_str(
        r#"
[oracle]
kind = "swetest"
executable = "/nonexistent/swetest"
ephemeris_dir = "/nonexistent/ephe"
"#,
    )
    .unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, EngineError::Configuration { .. }));
    assert!(provider_from_config(&config.oracle).is_err());
}

#[test]
fn test_default_provider_needs_no_configuration() {
    let config = EngineConfig::default();
    let provider = provider_from_config(&config.oracle).unwrap();
    assert_eq!(provider.engine_id(), "mean-sun");
}

#[test]
fn test_mean_sun_query_blocks_on() {
    let config = EngineConfig::from_toml_str("[oracle]\nkind = \"mean-sun\"\ncache_capacity = 0\n")
        .unwrap();
    let provider = provider_from_config(&config.oracle).unwrap();
    let utc = Utc.with_ymd_and_hms(2024, 3, 20, 3, 6, 0).unwrap();

    let reading = tokio_test::block_on(provider.query(utc)).unwrap();
    let longitude = reading.position.longitude();
    assert!(longitude < 0.05 || longitude > 359.95);
}
