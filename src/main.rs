use clap::Parser;
use config::Settings;
use store::LocalStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod compute;
mod config;
mod data;
mod normalize;
mod pipeline;
mod read;
mod store;
mod write;

/// Install the global `tracing` subscriber on stderr. `level` is any `EnvFilter`
/// directive; unknown values fall back to `info`.
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<(), anyhow::Error> {
    let settings = Settings::parse();
    setup_logging(&settings.log_level);

    let mut store = LocalStore::new(&settings.store_root);
    if let Err(e) = pipeline::run(&mut store, &settings.job()) {
        tracing::error!(stage = %e.stage(), "job failed: {e}");
        return Err(e.into());
    }
    Ok(())
}
