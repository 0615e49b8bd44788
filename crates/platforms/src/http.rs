//! Shared HTTP client construction.

use std::{sync::OnceLock, time::Duration};

use reqwest::Client;
use tracing::{debug, warn};

/// User agent sent with every API request.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Timeout applied to all platform API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Install the process-wide rustls crypto provider.
///
/// Required because reqwest is built with the `no-provider` TLS roots.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the HTTP client shared by the platform clients.
pub fn default_client() -> Client {
    install_rustls_provider();

    Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|error| {
            warn!(
                error = %error,
                "Failed to build configured HTTP client; falling back to reqwest defaults"
            );
            Client::new()
        })
}
