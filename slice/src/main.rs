use clap::Parser;
use cslice::cli::{Args, initialize};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    let config = match initialize(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return,
        Err(e) => {
            eprintln!("Error: invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();
    if let Err(e) = cslice::run(&config) {
        error!("Error: {e}");
        std::process::exit(1);
    }
}
