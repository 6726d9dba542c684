//! quant-brief: EV bridge, reverse DCF, sector KPIs and quality scores for one ticker.
//!
//! Usage:
//!   cargo run -p brief-cli -- --ticker NVDA --sector semis
//!   cargo run -p brief-cli -- --ticker CRM --sector saas --json
//!   cargo run -p brief-cli -- --ticker CRM --sector saas --supplement extracted.json
//!   cargo run -p brief-cli -- --list-sectors

mod report;

use anyhow::Context;
use brief_core::{all_templates, template};
use edgar_client::{EdgarClient, EdgarConfig, TreasuryClient, YahooQuoteClient};
use quant_engine::{
    check_kill_criteria, kpis_needing_extraction, ExtractedKpi, ExtractionRequest,
    FilingReference, KillCheck, QuantEngine, QuantOutput,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Values read out of a filing by an external extraction step
#[derive(Debug, Deserialize)]
struct SupplementFile {
    filing: FilingReference,
    kpis: Vec<ExtractedKpi>,
}

#[derive(Serialize)]
struct JsonBrief<'a> {
    #[serde(flatten)]
    output: &'a QuantOutput,
    kill_checks: &'a [KillCheck],
    needs_extraction: &'a [ExtractionRequest],
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .filter(|v| !v.starts_with("--"))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quant-brief --ticker SYMBOL --sector SECTOR   Print the quant brief");
    eprintln!("  quant-brief --list-sectors                    List sector templates");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json               Emit JSON instead of text");
    eprintln!("  --supplement PATH    Merge filing-extracted KPIs from a JSON file");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "brief_cli=info,quant_engine=info,edgar_client=warn".into());
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--list-sectors") {
        for t in all_templates() {
            println!("{:<8} {}", t.sector, t.display_name);
            println!("         {}", t.valuation_notes);
        }
        return Ok(());
    }

    let (Some(ticker), Some(sector)) = (arg_value(&args, "--ticker"), arg_value(&args, "--sector")) else {
        print_usage();
        std::process::exit(1);
    };
    let as_json = args.iter().any(|a| a == "--json");

    let template = template(sector)?;
    let config = EdgarConfig::from_env();
    let engine = QuantEngine::new(
        Arc::new(EdgarClient::new(config.clone())),
        Arc::new(YahooQuoteClient::new(&config)),
        Arc::new(TreasuryClient::new(&config)),
    );

    let mut output = engine
        .analyze(ticker, &template)
        .await
        .with_context(|| format!("quant analysis failed for {}", ticker))?;

    if let Some(path) = arg_value(&args, "--supplement") {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read supplement file {}", path))?;
        let supplement: SupplementFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid supplement file {}", path))?;
        let merged = output.apply_supplements(&template, &supplement.filing, &supplement.kpis);
        tracing::info!("Merged {} extracted KPIs from {}", merged, supplement.filing.form_type);
    }

    let checks = check_kill_criteria(&template.default_kill_criteria, &output);
    let pending = kpis_needing_extraction(&template, &output);

    if as_json {
        let brief = JsonBrief {
            output: &output,
            kill_checks: &checks,
            needs_extraction: &pending,
        };
        println!("{}", serde_json::to_string_pretty(&brief)?);
    } else {
        print!("{}", report::render(&output, &template, &checks, &pending));
    }

    Ok(())
}
