use std::sync::Arc;

use status_server::config::{self, Config};
use status_server::{logger, signal, Stats, StatsProvider, StatusServer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    let stats = Arc::new(Stats::new());
    let provider: Arc<dyn StatsProvider> = stats.clone();
    let builder = StatusServer::builder_from_config(&cfg, provider)?
        .endpoint("/build_info.txt", build_info);

    let mut server = if cfg.server.strict {
        builder.start_or_die()
    } else {
        builder.start()
    };
    stats.set_gauge("status_server.serving", i64::from(server.is_serving()));

    // Signals only; the status server runs on its own threads.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let received = runtime.block_on(signal::wait_for_shutdown())?;
    logger::log_info(&format!(
        "[SIGNAL] {} received, stopping status server",
        received.name()
    ));

    server.stop();
    Ok(())
}

fn build_info() -> String {
    format!(
        "name: {}\nversion: {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}
