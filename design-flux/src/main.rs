use clap::Parser;
use tracing_subscriber::EnvFilter;

use design_flux::cli::Args;
use design_flux::config::Settings;
use design_flux::pipeline::{run, Collaborators, RunConfig};
use design_flux_sdk::{log_info, log_outcome_summary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_env("DESIGN_FLUX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config: RunConfig = args.into();

    // Credentials are checked before any capture or model call
    let settings = Settings::from_env()?;
    let collaborators = Collaborators::from_settings(&settings, &config)?;

    let outcome = run(config, collaborators).await?;

    let ab = &outcome.summary.ab_testing;
    log_outcome_summary!(
        ab.total_variations - ab.failed_variations,
        ab.failed_variations,
        ab.total_variations
    );
    log_info!("Run {} complete", outcome.summary.metadata.run_id);
    Ok(())
}
