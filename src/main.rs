//! jsonstore - A Minimal HTTP/1.1 JSON Record Store
//!
//! This is the main entry point for the jsonstore server.
//! It reads the configuration, sets up logging, and runs the accept loop
//! until Ctrl+C.

use jsonstore::config::ServerConfig;
use jsonstore::server::Server;
use std::sync::atomic::Ordering;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig, address: &str) {
    println!(
        r#"
jsonstore v{} - Minimal HTTP/1.1 JSON Record Store
──────────────────────────────────────────────────────────────
Server started on http://{}
Max connections: {}   Codec workers: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        jsonstore::VERSION,
        address,
        config.max_connections,
        config.codec_workers,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments and environment
    let config = ServerConfig::from_args();

    // Set up logging; RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Bind the listener and start the codec pool
    let server = Server::bind(&config).await?;
    let address = server.local_addr()?.to_string();
    print_banner(&config, &address);

    let state = server.state().clone();

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler, running until killed");
            std::future::pending::<()>().await;
        }
    };

    server.run_until(shutdown).await;

    let stats = &state.stats;
    let store = state.store.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        active = stats.active_connections.load(Ordering::Relaxed),
        requests = stats.requests_completed.load(Ordering::Relaxed),
        frame_failures = stats.frame_failures.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        records = store.records,
        created = store.created,
        deleted = store.deleted,
        "Server shutdown complete"
    );
    Ok(())
}
