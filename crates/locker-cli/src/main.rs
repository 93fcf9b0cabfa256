mod bootstrap_helpers;
mod cli_args;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::LockerCli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = LockerCli::parse();
    let config = cli.to_locker_config()?;
    tracing::info!(
        catch_data = %config.catch_data_path.display(),
        monitored_bots = config.monitored_bot_ids.len(),
        log_channel = config.log_channel_id.is_some(),
        catch_log_channel = config.catch_log_channel_id.is_some(),
        "starting locker"
    );
    locker_discord::run_discord_bot(config, &cli.token).await
}
