use amsre_fusion::cli::{run, Cli};
use amsre_fusion::error::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
