//! Error types used by the crate.

use thiserror::Error;

/// GeoView error type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoviewError {
    /// The request could not be sent or the connection failed.
    #[error("failed to load {url}: {reason}")]
    Network {
        /// Requested url.
        url: String,
        /// Description of the failure.
        reason: String,
    },
    /// Server responded with a non-success status.
    #[error("failed to load {url}: server responded with status {status}")]
    HttpStatus {
        /// Requested url.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Loaded data does not conform to the format of the selected parser.
    #[error("failed to parse data: {0}")]
    Parse(String),
    /// The url does not end with one of the supported suffixes.
    #[error("unrecognized file format: {0} (expected .csv, .tsv, .dsv or .kml)")]
    UnrecognizedFormat(String),
    /// The file was parsed but contains no records or features.
    #[error("file is empty or not in expected format")]
    EmptyResult,
    /// None of the markup strategies could read the file. Contains the error of the last one.
    #[error("all markup strategies failed, last error: {0}")]
    StrategiesExhausted(Box<GeoviewError>),
    /// Error interacting with WASM runtime.
    #[error("wasm error: {0:?}")]
    Wasm(Option<String>),
}

impl From<csv::Error> for GeoviewError {
    fn from(value: csv::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<quick_xml::Error> for GeoviewError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Parse(format!("invalid XML: {value}"))
    }
}

impl From<std::str::Utf8Error> for GeoviewError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Parse(format!("data is not valid UTF-8: {value}"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for GeoviewError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network {
            url: value.url().map(|url| url.to_string()).unwrap_or_default(),
            reason: value.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for GeoviewError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        GeoviewError::Wasm(Some(format!("{value:?}")))
    }
}

