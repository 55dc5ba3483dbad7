use clap::Parser;
use harvest_agent::{build_core, logging, Config, CoreAction};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use url::Url;

#[derive(Parser)]
#[command(name = "harvest", version, about = "Scrape a page with a configured pipeline")]
struct Cli {
    /// Page to open before the configured pipeline runs
    target: Url,

    /// JSON config file (falls back to $HARVEST_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("harvest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("harvest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.target, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("harvest failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(target: Url, config: Config) -> harvest_agent::Result<()> {
    info!("config: {}", serde_json::to_string(&config)?);

    let mut steps = vec![CoreAction::open_url(target)];
    steps.extend(config.pipeline.clone());
    let pipeline = CoreAction::sequential(steps);

    let mut core = build_core(&config);
    core.scoped(|core| Box::pin(async move { core.perform(&pipeline).await }))
        .await?;

    info!("done");
    Ok(())
}
