//! `run`, `status` and `result` command handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sov_core::AppConfig;
use sov_pipeline::{
    Orchestrator, OrchestratorConfig, PgRunStore, RunReader, RunReport, RunService,
};
use sov_scoring::TeiClient;
use sov_scraper::{
    ChromeRenderer, ContentExtractor, CrawlerConfig, PageRenderer, SmartBlockCrawler,
};
use uuid::Uuid;

/// Extra wait after navigation for lazily loaded page content.
const RENDER_SETTLE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wires the production collaborators around one shared browser pool.
fn build_service(
    pool: sqlx::PgPool,
    config: &AppConfig,
) -> anyhow::Result<(RunService, Arc<ChromeRenderer>)> {
    let browser = Arc::new(ChromeRenderer::new(
        config.crawl_max_concurrent + config.extract_max_concurrent,
        config.browser_recycle_after,
        RENDER_SETTLE,
    ));
    let renderer: Arc<dyn PageRenderer> = browser.clone();

    let crawler = SmartBlockCrawler::new(
        Arc::clone(&renderer),
        CrawlerConfig::from_app_config(config),
    );
    let extractor = ContentExtractor::from_app_config(renderer, config)
        .context("failed to build content extractor")?;

    let mut orchestrator = Orchestrator::new(
        Arc::new(PgRunStore::new(pool)),
        Arc::new(crawler),
        Arc::new(extractor),
        OrchestratorConfig::from_app_config(config),
    );
    match config.embedding_url.as_deref() {
        Some(url) => {
            let tei = TeiClient::new(url).context("failed to build embedding client")?;
            orchestrator = orchestrator.with_embedder(Arc::new(tei));
        }
        None => tracing::warn!("SOV_EMBEDDING_URL is not set; relevance uses rule scores only"),
    }

    Ok((RunService::new(orchestrator), browser))
}

fn reader(pool: sqlx::PgPool) -> RunReader {
    RunReader::new(Arc::new(PgRunStore::new(pool)))
}

/// Submits a run, reports progress until it finishes, then prints the result.
///
/// # Errors
///
/// Returns an error if the request is invalid or the run cannot be stored or
/// read back. A run that ends `failed` is reported, not returned as an error.
pub(crate) async fn run_analysis(
    pool: sqlx::PgPool,
    config: &AppConfig,
    user: &str,
    keyword: &str,
    brands: &[String],
) -> anyhow::Result<()> {
    let (service, browser) = build_service(pool, config)?;
    let mut submitted = service.create_run(user, keyword, brands).await?;
    println!("run {} submitted", submitted.run_id);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.tick().await;
    let status = loop {
        tokio::select! {
            joined = &mut submitted.task => break joined.context("run task panicked")?,
            _ = ticker.tick() => {
                let progress = service.get_run_status(submitted.run_id).await?;
                println!(
                    "  {}: {}/{} exposures",
                    progress.status, progress.processed_exposures, progress.total_exposures
                );
            }
        }
    };
    browser.shutdown().await;

    println!("run {} finished: {status}", submitted.run_id);
    let report = service.get_run_result(submitted.run_id).await?;
    print_report(&report);
    Ok(())
}

/// # Errors
///
/// Returns an error if the run does not exist or cannot be read.
pub(crate) async fn show_status(pool: sqlx::PgPool, run_id: Uuid) -> anyhow::Result<()> {
    let progress = reader(pool).get_run_status(run_id).await?;
    println!("status:    {}", progress.status);
    println!(
        "progress:  {}/{} exposures",
        progress.processed_exposures, progress.total_exposures
    );
    if let Some(message) = progress.error_message {
        println!("error:     {message}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the run does not exist or has not finished yet.
pub(crate) async fn show_result(pool: sqlx::PgPool, run_id: Uuid) -> anyhow::Result<()> {
    let report = reader(pool).get_run_result(run_id).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    let run = &report.run;
    println!(
        "keyword \"{}\" [{}]: {} exposures",
        run.market_keyword, run.status, run.total_exposures
    );
    if let Some(message) = &run.error_message {
        println!("error: {message}");
        return;
    }

    println!();
    println!("{:<24} {:>8} {:>8}", "brand", "count", "sov %");
    for result in &report.results {
        println!(
            "{:<24} {:>8} {:>8}",
            result.brand,
            result.exposure_count,
            result.sov_percentage.to_string()
        );
    }

    if !report.by_type.is_empty() {
        println!();
        println!(
            "{:<20} {:<24} {:>8} {:>8} {:>8}",
            "block", "brand", "count", "of", "%"
        );
        for row in &report.by_type {
            println!(
                "{:<20} {:<24} {:>8} {:>8} {:>8}",
                row.block_type,
                row.brand,
                row.exposure_count,
                row.total_in_type,
                row.percentage.to_string()
            );
        }
    }

    if !report.exposures.is_empty() {
        println!();
        for exposure in &report.exposures {
            println!(
                "{:>3}. [{}] {} ({})",
                exposure.position, exposure.block_type, exposure.url, exposure.extraction_status
            );
        }
    }
}
