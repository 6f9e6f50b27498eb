//! Platform specific stuff for native targets.

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};

use crate::error::GeoviewError;
use crate::platform::PlatformService;

/// Platform service for native targets. Uses a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct NativePlatformService {
    http_client: reqwest::Client,
}

#[async_trait]
impl PlatformService for NativePlatformService {
    fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("geoview/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!("Failed to configure http client, falling back to defaults: {err}");
                reqwest::Client::new()
            });

        Self { http_client }
    }

    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, GeoviewError> {
        debug!("Requesting {url}");
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("Failed to load {url}: {status}, {:?}", response.text().await);
            return Err(GeoviewError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}
