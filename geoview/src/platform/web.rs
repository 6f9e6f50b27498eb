//! Platform specific stuff for WASM32 (web) targets.

use async_trait::async_trait;
use bytes::Bytes;
use js_sys::Uint8Array;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response, WorkerGlobalScope};

use crate::error::GeoviewError;
use crate::platform::PlatformService;

/// Platform service for Web target. Uses the `fetch` API of the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebPlatformService {}

#[async_trait(?Send)]
impl PlatformService for WebPlatformService {
    fn new() -> Self {
        Self {}
    }

    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, GeoviewError> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);

        let request = Request::new_with_str_and_init(url, &opts)?;

        let resp_value = if let Some(window) = web_sys::window() {
            JsFuture::from(window.fetch_with_request(&request)).await
        } else if let Ok(global) = js_sys::global().dyn_into::<WorkerGlobalScope>() {
            JsFuture::from(global.fetch_with_request(&request)).await
        } else {
            return Err(GeoviewError::Wasm(Some(
                "Global object is not available".into(),
            )));
        };

        let resp_value = resp_value.map_err(|err| GeoviewError::Network {
            url: url.to_string(),
            reason: format!("{err:?}"),
        })?;
        let resp: Response = resp_value.dyn_into()?;
        if !resp.ok() {
            return Err(GeoviewError::HttpStatus {
                url: url.to_string(),
                status: resp.status(),
            });
        }

        let bytes_val = JsFuture::from(resp.array_buffer()?).await?;
        let array = Uint8Array::new(&bytes_val);
        Ok(array.to_vec().into())
    }
}
