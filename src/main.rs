use anyhow::Context;
use bazi_engine::utils::error::{EngineError, ErrorSeverity};
use bazi_engine::utils::{logger, validation::Validate};
use bazi_engine::{cancel_pair, provider_from_config, CliArgs, EngineConfig, PillarEngine};
use clap::Parser;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 130,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(stage: &str, e: &EngineError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_log {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting bazi-engine");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .unwrap_or_else(|e| report_failure("Loading configuration", &e)),
        None => EngineConfig::default(),
    };

    if let Err(e) = config.validate().and_then(|_| args.validate()) {
        report_failure("Configuration validation", &e);
    }

    let provider = provider_from_config(&config.oracle)
        .unwrap_or_else(|e| report_failure("Building the solar oracle", &e));
    let calendar = args
        .calendar()
        .unwrap_or_else(|e| report_failure("Reading cycle indices", &e));
    let engine = PillarEngine::with_options(provider, calendar, config.engine_options());
    let alphabet = args.alphabet.map(Into::into).unwrap_or(config.alphabet());

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling calculation");
            cancel.cancel();
        }
    });

    let moment = args.birth_moment();
    match engine.calculate_with_cancel(&moment, &signal).await {
        Ok(chart) => {
            tracing::info!(
                "✅ Chart computed with {} ({} oracle call(s))",
                chart.engine,
                chart.diagnostics.oracle_calls
            );
            let report = chart.report(alphabet);
            let json =
                serde_json::to_string_pretty(&report).context("serializing chart report")?;
            println!("{}", json);
        }
        Err(e) => report_failure("Chart calculation", &e),
    }

    Ok(())
}
