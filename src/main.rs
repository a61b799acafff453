use clap::Parser;
use site_capture::{describe_metrics, load_config, setup_logging, Cli, CliRunner};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose);

    info!("Starting site-capture v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    describe_metrics();

    let runner = CliRunner::new(config);

    let result = tokio::select! {
        result = runner.run(args.command) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, stopping");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("Application error: {:#}", e);
    }

    result
}
