use std::path::PathBuf;

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Result type for GPX reading and metric operations.
pub type Result<T> = std::result::Result<T, GpxError>;

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("Malformed GPX document: {0}")]
    MalformedDocument(String),

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Invalid value '{value}' in <{element}>")]
    InvalidValue { element: &'static str, value: String },

    #[error("Invalid datetime: {0}")]
    InvalidTimestamp(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GpxError {
    /// True for structural violations of the document (root cardinality,
    /// missing or unreadable point coordinates).
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument(_) | Self::InvalidAttribute { .. }
        )
    }
}

impl From<quick_xml::events::attributes::AttrError> for GpxError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(e.into())
    }
}

impl From<toml::de::Error> for GpxError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Errors raised by elevation providers. The core passes them through as-is.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} parameter is required")]
    MissingCredential(&'static str),

    #[error("elevation request failed: {0}")]
    Transport(String),

    #[error("elevation service returned status {status}: {message}")]
    Upstream { status: i64, message: String },

    #[error("unexpected elevation response: {0}")]
    InvalidResponse(String),

    #[error("unknown elevation provider '{0}'")]
    UnknownProvider(String),
}
