use clap::Parser;
use marginalia::config::{Cli, Config, default_config_path};
use marginalia::sync;
use marginalia::unpack_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let config_path = match args.config_path {
        Some(path) => std::path::PathBuf::from(path),
        None => default_config_path(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("marginalia starting");

    let cfg = Config::new(config_path.to_str().unwrap()).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&*e), path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    if let Err(e) = sync::run(&cfg).await {
        tracing::error!(error = %unpack_error(&*e), "sync pass failed");
        std::process::exit(1);
    }

    tracing::info!("process finished");
}
