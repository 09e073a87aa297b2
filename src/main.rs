use clap::Parser;
use swapguard::adapter::inbound::cli::{self, command::Cli};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let _ = dotenvy::dotenv();
    cli::run(Cli::parse()).await
}
