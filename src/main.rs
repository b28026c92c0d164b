use anyhow::Result;
use clap::Parser;

use articleforge_rs::cli::Args;
use articleforge_rs::generator::workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.into_config()?;

    if config.verbose {
        println!("🔧 配置: {}", toml::to_string_pretty(&config)?);
    }

    workflow::launch(config).await
}
