use clap::Parser;
use tiermirror::cli::{run, usage, Cli, UsageError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tiermirror={}", log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(usage_error) = e.downcast_ref::<UsageError>() {
                println!("{}", usage_error);
                println!();
                println!("{}", usage());
                std::process::exit(2);
            }
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
