use clap::Parser;
use relay_rs::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    relay_rs::logging::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => relay_rs::run(args).await,
    }
}
