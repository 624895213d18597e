use crate::config::NetworkConfig;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with its own cookie jar
///
/// Every worker builds its own client, so cookies (and therefore logins) are never
/// shared between workers. All traffic goes through the configured proxy, if any.
///
/// # Arguments
///
/// * `config` - The network configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or TLS backend failure
///
/// # Example
///
/// ```no_run
/// use forum_harvest::config::NetworkConfig;
/// use forum_harvest::session::build_http_client;
///
/// let mut config = NetworkConfig::default();
/// config.proxy_url = Some("socks5h://127.0.0.1:9050".to_string());
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = &config.proxy_url {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    builder.build()
}
