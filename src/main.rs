use anyhow::Result;
use clap::Parser;
use quest::{cli, util, Cli, Config};
use std::fs::{self, OpenOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = util::init_data_dir(cli.data_dir.clone());

    // Log to <data_dir>/logs/quest.log
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();
    tracing::debug!(data_dir = %data_dir.display(), "Starting quest");

    let config = Config::load();

    cli::run(cli.command, config).await
}
