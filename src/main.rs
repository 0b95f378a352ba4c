use clap::Parser;
use tracing_subscriber::EnvFilter;

use diffdrive_runtime::config::{Config, Options};

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // Configuration is read and validated once; a bad config never reaches
    // the run loop.
    let opts = Options::parse();
    let cfg = match Config::from_options(&opts) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = diffdrive_runtime::runtime::run(cfg).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
