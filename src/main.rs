mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use offerbox::config::Config;
use offerbox::offerings::{DirectorySource, HandlerCatalog, LoadError, OfferingRegistry};
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => offerbox::api::run(args.address).await?,
        Commands::Check(args) => check(&args.offering).await?,
    }

    Ok(())
}

async fn check(offering: &str) -> Result<(), AnyError> {
    let config = Config::load()?;
    let source = DirectorySource::new(
        config.seller.offerings_dir.clone(),
        HandlerCatalog::with_builtins(),
    );
    let registry = OfferingRegistry::new(Arc::new(source));

    match registry.resolve(offering).await {
        Ok(resolved) => {
            let report = serde_json::json!({
                "descriptor": resolved.descriptor,
                "capabilities": resolved.handlers.capabilities(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            for violation in err.violations() {
                eprintln!("  - {violation}");
            }
            if matches!(err, LoadError::NotFound(_)) {
                eprintln!(
                    "  expected {}/{offering}/offering.json",
                    config.seller.offerings_dir.display()
                );
            }
            Err(err.into())
        }
    }
}
