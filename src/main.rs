use clap::Parser;
use user_cache_core::cli::{self, Cli, Command};
use user_cache_core::infrastructure::logging::init_logging;
use user_cache_core::{AppConfig, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    let ctx = AppContext::build(&config).await?;

    let result = match cli.command {
        Command::Health => cli::health::run(&ctx).await,
        Command::User(command) => cli::user::run(&ctx, command).await,
    };

    ctx.shutdown().await;
    result
}
