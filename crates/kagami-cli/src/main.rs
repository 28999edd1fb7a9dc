//! Kagami CLI main entry point

use anyhow::Result;
use clap::Parser;
use kagami_cli::commands::{Cli, CommandExecutor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Execute the command
    let mut executor = CommandExecutor::new();
    let result = executor.execute(cli.command).await?;

    if !result.message.is_empty() {
        println!("{}", result.message);
    }

    // Exit with appropriate code
    if result.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
