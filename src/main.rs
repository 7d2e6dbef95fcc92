use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use layer_accounts::cli::{ops, Cli};
use layer_accounts::config::LayerConfig;

fn main() {
    let cli = Cli::parse();
    let config = LayerConfig::load_or_default(&cli.config);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = ops::run(cli.command, &config) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
