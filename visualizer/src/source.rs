use tourcore::dataset::DatasetSource;
use tourcore::model::DatasetTable;
use tourcore::prelude::{DatasetError, DatasetResult};

pub const DEFAULT_DATASET_URL: &str = "http://127.0.0.1:9000/dataset";

/// Monthly table served by the simulator's HTTP bridge.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// `TOURVIS_DATASET_URL`, else the local bridge.
    pub fn from_env() -> Self {
        let url = std::env::var("TOURVIS_DATASET_URL")
            .unwrap_or_else(|_| DEFAULT_DATASET_URL.to_string());
        Self::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DatasetSource for HttpSource {
    async fn load(&self) -> DatasetResult<DatasetTable> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DatasetError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DatasetError::Transport(format!(
                "HTTP error! status: {}",
                response.status()
            )));
        }
        response
            .json::<DatasetTable>()
            .await
            .map_err(|e| DatasetError::Transport(e.to_string()))
    }
}
