use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat Data Args ---
    /// Data root directory; chat logs are read from <data-root>/chats/<character>/*.jsonl
    #[arg(long, env = "DATA_ROOT", default_value = ".")]
    pub data_root: String,

    /// Maximum number of chat log files read concurrently for one request.
    #[arg(long, env = "MAX_CONCURRENT_READS", default_value = "16")]
    pub max_concurrent_reads: usize,

    /// Print the last messages of this character's chats (avatar file name) and exit instead of serving.
    #[arg(long, env = "CHARACTER")]
    pub character: Option<String>,

    // --- Helper Server Args ---
    /// Address the helper HTTP server listens on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3001")]
    pub server_addr: String,

    /// Global request quota per second. 0 disables rate limiting.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value = "20")]
    pub rate_limit_per_second: u32,

    /// Seconds to wait for the server to report it is listening.
    #[arg(long, env = "STARTUP_TIMEOUT_SECS", default_value = "10")]
    pub startup_timeout_secs: u64,

    /// Seconds in-flight requests get to finish on shutdown before the server is stopped forcibly.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
    pub shutdown_timeout_secs: u64,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
