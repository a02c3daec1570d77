use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

/// Shared client for the model API and Telegram file downloads. Individual
/// requests may set a longer timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}
