use serde::{Deserialize, Serialize};

/// Identifier of a city in the catalog (`"nyc"`, `"lasvegas"`, ...).
pub type CityId = String;

/// Handle to the host element the map is mounted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub element_id: String,
}

impl ContainerHandle {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }
}

/// Failures while loading the monthly dataset. Never escapes the provider.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("dataset io: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal-to-the-map setup failures; the rest of the page keeps working.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MapInitError {
    #[error("map rendering library is not available")]
    RendererUnavailable,
    #[error("map container `{0}` not found")]
    ContainerMissing(String),
}

impl MapInitError {
    /// Message shown to the reader in the error banner.
    pub fn user_message(&self) -> &'static str {
        match self {
            MapInitError::RendererUnavailable => {
                "Map library not available. Please check your internet connection and refresh the page."
            }
            MapInitError::ContainerMissing(_) => "Could not find map container element.",
        }
    }
}

pub type DatasetResult<T> = Result<T, DatasetError>;
pub type MapInitResult<T> = Result<T, MapInitError>;
