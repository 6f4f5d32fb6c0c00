#[macro_use]
extern crate tracing;

use crate::{
    chain::{ChainGraph, ChainRenderer},
    cli::Cli,
    configs::GlobalConfig,
    fetch::ChainFetcher,
    trust_store::RootStore,
    types::CertificateRecords,
};
use anyhow::{Context, Result as AnyResult};
use clap::Parser;
use std::io::{stdout, Write};
use tracing_subscriber::EnvFilter;

mod chain;
mod cli;
mod configs;
mod decoder;
mod error;
mod fetch;
mod trust_store;
mod types;

fn main() -> AnyResult<()> {
    // Load environment variables from the `.env` file
    dotenvy::dotenv().ok();
    // Initialize the logger after loading the environment variables
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut app_config = GlobalConfig::load_config().context("Failed to parse configuration files")?;
    cli.apply_to(&mut app_config);
    debug!("Effective configuration: {:?}", app_config);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to bootstrap the Tokio runtime")?
        .block_on(run(cli, app_config))
}

async fn run(cli: Cli, app_config: GlobalConfig) -> AnyResult<()> {
    let (source, records) = load_records(&cli, &app_config).await?;
    let roots = load_roots(&app_config).await?;

    let mut out = stdout().lock();
    writeln!(out, "Source: {} ({} certificates)", source, records.len())?;
    if cli.show_pem {
        for record in &records {
            writeln!(out, "[{}] {}", record.index, record.subject)?;
            write!(out, "{}", record.raw_text)?;
        }
    }
    writeln!(out)?;

    // Everything past this point is read-only over the decoded records
    let graph = ChainGraph::build(&records);
    let report = ChainRenderer::new(&graph, &roots).render();
    report.write_to(&mut out)?;
    out.flush()?;

    let warnings = report.warnings().count();
    if warnings > 0 {
        info!("Report contains {} warnings", warnings);
    }
    Ok(())
}

async fn load_records(
    cli: &Cli,
    app_config: &GlobalConfig,
) -> AnyResult<(String, CertificateRecords)> {
    if let Some(path) = &cli.file {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records = decoder::decode_pem_bundle(&data)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        return Ok((path.display().to_string(), records));
    }

    let target = cli
        .target
        .as_ref()
        .context("Either a target or --file is required")?;
    let fetcher = ChainFetcher::new(
        app_config.timeout,
        app_config.default_port,
        app_config.sni_fallback,
    );
    let certs = fetcher.fetch(target).await?;
    let records = decoder::decode_der_chain(&certs)
        .with_context(|| format!("Failed to decode the chain presented by {}", target))?;

    Ok((target.socket_address(app_config.default_port), records))
}

async fn load_roots(app_config: &GlobalConfig) -> AnyResult<RootStore> {
    let roots = match &app_config.trust_bundle {
        Some(bundle) => RootStore::load(bundle)
            .await
            .with_context(|| format!("Failed to load trust bundle {}", bundle.describe()))?,
        None => RootStore::from_native().context("Failed to load the platform root store")?,
    };
    if roots.is_empty() {
        warn!("The root store is empty, no chain will be reported as trusted");
    }
    Ok(roots)
}
