// ABOUTME: Public address resolution through an external HTTPS endpoint.
// ABOUTME: The endpoint answers a plain GET with the caller's address as text.

use async_trait::async_trait;
use reqwest::Client;
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_LOOKUP_URL: &str = "https://checkip.amazonaws.com";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("address lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("address lookup returned status {0}")]
    Status(u16),

    #[error("address lookup returned an invalid address: {0:?}")]
    InvalidAddress(String),
}

/// Resolves the caller's current public address.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self) -> Result<IpAddr, LookupError>;
}

/// Lookup over HTTPS with certificate verification and a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpAddressLookup {
    client: Client,
    url: String,
}

impl HttpAddressLookup {
    /// # Errors
    ///
    /// Returns `LookupError::Request` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse the response body: surrounding whitespace is ignored.
pub fn parse_address(body: &str) -> Result<IpAddr, LookupError> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|_| LookupError::InvalidAddress(trimmed.to_string()))
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self) -> Result<IpAddr, LookupError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        parse_address(&body)
    }
}
