use anyhow::Result;
use chatrelay::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    chatrelay::app::execute(cli).await
}
