pub mod aggregator;
pub mod cli;
pub mod client;
pub mod history;
pub mod models;
pub mod render;
pub mod server;

use aggregator::{ strip_image_extension, LastMessageAggregator };
use cli::Args;
use log::{ error, info, warn };
use server::api::{ self, AppState };
use server::{ ServerConfig, TlsPaths };
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Data Root: {}", args.data_root);
    info!("Max Concurrent Reads: {}", args.max_concurrent_reads);
    info!("Server Address: {}", args.server_addr);
    info!("Rate Limit (req/s): {}", args.rate_limit_per_second);
    info!("Shutdown Timeout: {:?}", args.shutdown_timeout());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let aggregator = LastMessageAggregator::new(&args.data_root, args.max_concurrent_reads);

    if let Some(character) = &args.character {
        let summaries = aggregator.aggregate(character).await?;
        let name = strip_image_extension(character);
        print!("{}", render::render_summaries(name, &summaries, &chrono::Local));
        return Ok(());
    }

    let config = server_config(&args)?;
    let app = api::router(AppState::new(aggregator, args.rate_limit_per_second));
    let mut server = server::spawn(config, app).await?;

    tokio::select! {
        _ = shutdown_signal() => {}
        result = server.join() => {
            result?;
            warn!("Helper server exited unexpectedly.");
            return Ok(());
        }
    }

    server.stop(args.shutdown_timeout()).await;
    Ok(())
}

pub fn server_config(args: &Args) -> Result<ServerConfig, Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr
        .parse::<SocketAddr>()
        .map_err(|e| format!("Invalid server address '{}': {}", args.server_addr, e))?;

    let tls = if args.enable_tls {
        match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) =>
                Some(TlsPaths {
                    cert_path: PathBuf::from(cert_path),
                    key_path: PathBuf::from(key_path),
                }),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        }
    } else {
        if args.tls_cert_path.is_some() || args.tls_key_path.is_some() {
            warn!("TLS certificate/key paths are ignored because --enable-tls is not set.");
        }
        None
    };

    Ok(ServerConfig {
        addr,
        tls,
        startup_timeout: args.startup_timeout(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{ signal, SignalKind };
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down."),
        _ = terminate => info!("Received SIGTERM, shutting down."),
    }
}
