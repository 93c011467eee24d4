use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use objectftp::storage::memory::MemoryBackend;
use objectftp::storage::StorageBackend;
use objectftp::{server, ServerSettings};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = ObjectFtpCli::parse();

    if let Some(ObjectFtpSubcommand::Version) = cli.command {
        println!("objectftp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = match &cli.config {
        Some(path) => ServerSettings::from_file(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerSettings::defaults(),
    };
    let settings = Arc::new(settings);

    if cli.debug {
        spawn_diagnostics_endpoint();
    }

    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());

    let addr = format!("{}:{}", settings.listen_host, settings.listen_port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "objectftp listening");

    server::run(listener, settings, storage, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    Ok(())
}

/// Substitutes a pprof-style diagnostics HTTP listener with a minimal
/// plaintext one: accepts connections on `localhost:6060` and writes a
/// one-line liveness banner. Enough to confirm the process is alive without
/// pulling in an HTTP stack for a debug-only feature.
fn spawn_diagnostics_endpoint() {
    tokio::spawn(async move {
        let listener = match TcpListener::bind("127.0.0.1:6060").await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(cause = %e, "failed to bind diagnostics endpoint, skipping");
                return;
            }
        };
        info!("diagnostics endpoint listening on 127.0.0.1:6060");
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { continue };
            tokio::spawn(async move {
                use tokio::io::AsyncWriteExt;
                let _ = socket.write_all(b"objectftp: alive\n").await;
            });
        }
    });
}

#[derive(Debug, Parser)]
#[command(name = "objectftp", version, author)]
/// An FTP server backed by a pluggable object-storage driver.
struct ObjectFtpCli {
    #[clap(subcommand)]
    command: Option<ObjectFtpSubcommand>,
    /// Path to a TOML config file; built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Start the plaintext diagnostics endpoint on 127.0.0.1:6060.
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum ObjectFtpSubcommand {
    /// Print the server version and exit.
    Version,
}
