//! The server binary: parses configuration from the command line and
//! environment, then runs the TCP accept loop until SIGINT/SIGTERM.
use clap::Parser;
use nanored::{DEFAULT_HOST, DEFAULT_PORT};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();

    let config = Config::parse();
    let addr = (config.host.as_str(), config.port);
    let listener = TcpListener::bind(addr).await?;
    info!(host = %config.host, port = config.port, max_connections = config.max_connections, "starting server");

    nanored::server::run(listener, config.max_connections, shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[derive(Debug, Parser)]
#[command(name = "nanored-server", version, about = "An in-memory, RESP2-compatible key-value server")]
struct Config {
    /// Address to bind.
    #[arg(long, env = "NANORED_HOST", default_value = DEFAULT_HOST)]
    host: String,
    /// Port to listen on.
    #[arg(long, env = "NANORED_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Maximum number of concurrent client connections.
    #[arg(long, env = "NANORED_MAX_CONNECTIONS", default_value_t = 250)]
    max_connections: usize,
}
