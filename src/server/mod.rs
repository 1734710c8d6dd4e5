//! Supervised lifecycle for the helper HTTP server.
//!
//! `spawn` starts serving on a background task and returns once the listener
//! is bound. `ServerHandle::stop` drains in-flight requests for a bounded
//! window and then closes remaining connections forcibly.

pub mod api;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use log::{ error, info, warn };
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind helper server to {addr}: {source}")] Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to load TLS certificate/key: {0}")] Tls(#[source] io::Error),
    #[error("helper server did not start listening within {0:?}")] StartupTimeout(Duration),
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    pub startup_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Graceful,
    Forced,
}

pub struct ServerHandle {
    addr: SocketAddr,
    handle: Handle,
    task: JoinHandle<io::Result<()>>,
}

pub async fn spawn(config: ServerConfig, app: Router) -> Result<ServerHandle, ServerError> {
    let handle = Handle::new();
    let service = app.into_make_service();

    let task = match &config.tls {
        Some(tls) => {
            info!(
                "TLS enabled. Loading certificate from '{}' and key from '{}'",
                tls.cert_path.display(),
                tls.key_path.display()
            );
            let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await.map_err(
                ServerError::Tls
            )?;
            tokio::spawn(
                axum_server::bind_rustls(config.addr, rustls).handle(handle.clone()).serve(service)
            )
        }
        None => {
            tokio::spawn(axum_server::bind(config.addr).handle(handle.clone()).serve(service))
        }
    };

    match tokio::time::timeout(config.startup_timeout, handle.listening()).await {
        Ok(Some(addr)) => {
            let protocol = if config.tls.is_some() { "https" } else { "http" };
            info!("Helper server listening on: {}://{}", protocol, addr);
            Ok(ServerHandle { addr, handle, task })
        }
        Ok(None) => {
            let source = match task.await {
                Ok(Err(e)) => e,
                Ok(Ok(())) => io::Error::other("server exited before listening"),
                Err(join_error) => io::Error::other(join_error.to_string()),
            };
            error!("Failed to bind helper server to {}: {}", config.addr, source);
            Err(ServerError::Bind { addr: config.addr, source })
        }
        Err(_) => {
            task.abort();
            Err(ServerError::StartupTimeout(config.startup_timeout))
        }
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Resolves when the server task ends on its own.
    pub async fn join(&mut self) -> io::Result<()> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(join_error) => Err(io::Error::other(join_error.to_string())),
        }
    }

    pub async fn stop(self, timeout: Duration) -> StopOutcome {
        info!(
            "Stopping helper server on {} ({} open connections)",
            self.addr,
            self.handle.connection_count()
        );
        self.handle.graceful_shutdown(None);

        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                info!("Helper server stopped gracefully.");
                StopOutcome::Graceful
            }
            Ok(Ok(Err(e))) => {
                error!("Helper server exited with error during shutdown: {}", e);
                StopOutcome::Graceful
            }
            Ok(Err(join_error)) => {
                error!("Helper server task failed during shutdown: {}", join_error);
                StopOutcome::Graceful
            }
            Err(_) => {
                warn!("Graceful shutdown exceeded {:?}; forcing helper server to stop.", timeout);
                self.handle.shutdown();
                task.abort();
                let _ = task.await;
                StopOutcome::Forced
            }
        }
    }
}
