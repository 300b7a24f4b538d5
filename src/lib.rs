pub mod accuracy;
pub mod cli;
pub mod db;
pub mod reference;
pub mod settings;
pub mod tracker;
pub mod transfer;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use cli::Cli;

pub fn run() -> anyhow::Result<()> {
    // RUST_LOG, when set, refines the default level.
    env_logger::Builder::new()
        .filter_level(default_log_level(std::env::var("WATCHDRIFT_DEBUG").ok().as_deref()))
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(cli::execute(cli))
}

/// Quiet unless `WATCHDRIFT_DEBUG` is `1` or `true`.
fn default_log_level(debug: Option<&str>) -> LevelFilter {
    match debug {
        Some(value) if value == "1" || value.eq_ignore_ascii_case("true") => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    }
}
