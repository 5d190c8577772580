use clap::Parser;

use xTrader::cli::{self, Cli};
use xTrader::config::Config;
use xTrader::utils::logging;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = Config::load()?;
    logging::init(&config.logging)?;
    log::info!(
        "Trading bot starting (exchange: {}, mock: {})",
        config.exchange.name,
        cli.mock || config.exchange.use_mock,
    );

    if let Err(e) = cli::execute(cli, config).await {
        // a user-requested stop is a normal terminal state
        if e.is_interrupted() {
            log::warn!("{}", e);
            return Ok(());
        }
        return Err(e.into());
    }
    Ok(())
}
