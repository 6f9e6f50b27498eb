//! Provides platform specific logic and [`PlatformService`] to access it.

use std::sync::OnceLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::GeoviewError;

/// Service providing some platform specific functions in a generic way.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PlatformService {
    /// Creates a new instance of the service. This method is a part of the trait to allow other
    /// types be agnostic of the specific type of the platform service they work with.
    fn new() -> Self;

    /// Loads a byte array from the given url.
    ///
    /// Responses with a non-success status are reported as [`GeoviewError::HttpStatus`].
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, GeoviewError>;
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

/// Default implementation of the [`PlatformService`] for the current platform.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformServiceImpl = native::NativePlatformService;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Default implementation of the [`PlatformService`] for the current platform.
#[cfg(target_arch = "wasm32")]
pub type PlatformServiceImpl = web::WebPlatformService;

static SERVICE: OnceLock<PlatformServiceImpl> = OnceLock::new();

/// Returns the singleton instance of the platform service.
pub fn instance() -> &'static PlatformServiceImpl {
    SERVICE.get_or_init(PlatformServiceImpl::new)
}
