use feargreed::config::FearGreedConfig;
use feargreed::pipeline::FearGreedPipeline;
use feargreed::sink::{CsvSink, ResultSink};
use feargreed::source::CsvSource;

use anyhow::Result;
use log::{info, warn};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG not set
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    env_logger::init();
    info!("Starting Fear & Greed index computation");

    // Get config file from command line argument or use default
    let args: Vec<String> = env::args().collect();
    let config_file = args.get(1).map(String::as_str).unwrap_or("config.json");

    let config = FearGreedConfig::load_from_file(config_file)?;
    let variant = config.variant_config()?;
    info!(
        "Variant {:?}: components {:?}, rank window {}",
        variant.variant,
        variant.component_names(),
        variant.rank_window
    );

    let source = CsvSource::new(
        &config.source.index_path,
        &config.source.universe_path,
        config.source.index_id.clone(),
    )
    .with_start_date(variant.source_start)
    .with_ticker_code_length(config.source.ticker_code_length);

    let pipeline = FearGreedPipeline::new(variant)?;
    let generated_at = chrono::Local::now().naive_local();

    let (index, universe) = pipeline.load(&source)?;
    let report = pipeline
        .run_parallel(Arc::new(index), universe.map(Arc::new), generated_at)
        .await?;

    CsvSink::new(&config.output.path).write(&report)?;

    match (report.trading_dates.first(), report.trading_dates.last()) {
        (Some(first), Some(last)) => info!("Report covers {} rows from {} to {}", report.len(), first, last),
        _ => warn!("Report is empty; check the cutoff and source date range"),
    }
    if let Some((date, score)) = report.latest_score() {
        info!("Latest Fear & Greed score: {:.2} on {}", score, date);
    }

    Ok(())
}
