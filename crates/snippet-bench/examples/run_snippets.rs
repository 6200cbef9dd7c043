//! Run a snippet suite from a TOML config file in headless Chromium
//!
//! Usage: cargo run -p snippet-bench --example run_snippets -- <config.toml> [format]
//!
//! `format` is one of `console` (default), `json`, `json-pretty` or `markdown`.

use anyhow::{Context, Result};
use chromiumoxide::browser::BrowserConfig;
use snippet_bench::probe::Collaborators;
use snippet_bench::reporter::{OutputFormat, Reporter};
use snippet_bench::{ChromiumHost, Config, FileCounterStore, Harness};
use std::env;
use std::path::PathBuf;

// Samples must not interleave with anything else the process runs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snippet_bench=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .context("Usage: run_snippets <config.toml> [format]")?;
    let format: OutputFormat = match args.get(2) {
        Some(f) => f.parse()?,
        None => OutputFormat::Console,
    };

    let config = Config::from_file(config_path)?;
    config.validate()?;
    let snippets = config.load_snippets()?;

    let counter_path = config
        .benchmark
        .counter_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("target/snippet-bench-counter.json"));
    let counter = FileCounterStore::new(counter_path);

    let browser = BrowserConfig::builder()
        .build()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let host = ChromiumHost::launch(browser, config.measurement.warm_quantum()).await?;
    if config.measurement.cpu_slowdown > 1.0 {
        host.throttle_cpu(config.measurement.cpu_slowdown).await?;
    }

    let collaborators = Collaborators {
        host: &host,
        clock: &host,
        scheduler: &host,
        warmer: &host,
        trace: Some(&host),
    };
    let results = Harness::new(config.harness_config(), collaborators, &counter)
        .run(&config.benchmark.name, &snippets)
        .await;

    host.close().await?;
    Reporter::new(format).report(&results?)?;

    Ok(())
}
