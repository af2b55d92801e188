use std::path::PathBuf;

use clap::Parser;

use airsports_tracker::Configuration;

/// Follow a navigation task live and log the standings
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Host configuration (JSON)
    #[arg(short, long, env = "AIRSPORTS_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    airsports_tracker::init_logging();
    let args = Args::parse();

    let config = match Configuration::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = airsports_tracker::run(config).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
