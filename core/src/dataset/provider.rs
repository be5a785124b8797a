use crate::dataset::fallback::{fallback_for, fallback_table};
use crate::map::period::{PeriodLoaded, PeriodRequest};
use crate::model::time_point::dataset_key;
use crate::model::{DatasetTable, MetricRecord};
use crate::prelude::{DatasetError, DatasetResult};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the full monthly table comes from (file, HTTP endpoint, memory).
pub trait DatasetSource: Send + Sync {
    fn load(&self) -> impl Future<Output = DatasetResult<DatasetTable>> + Send;
}

/// Serves a table held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    table: DatasetTable,
}

impl StaticSource {
    pub fn new(table: DatasetTable) -> Self {
        Self { table }
    }
}

impl DatasetSource for StaticSource {
    async fn load(&self) -> DatasetResult<DatasetTable> {
        Ok(self.table.clone())
    }
}

/// Reads a `tourism-data.json` style file on every load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for JsonFileSource {
    async fn load(&self) -> DatasetResult<DatasetTable> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// A source that is never reachable; every fetch is served from fallback data.
#[derive(Debug, Clone, Default)]
pub struct UnavailableSource;

impl DatasetSource for UnavailableSource {
    async fn load(&self) -> DatasetResult<DatasetTable> {
        Err(DatasetError::Transport("dataset source unavailable".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetOrigin {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDataset {
    pub records: Vec<MetricRecord>,
    pub origin: DatasetOrigin,
}

/// Per-period records with a fallback-over-failure policy: `fetch` never fails.
pub struct DatasetProvider<S> {
    source: S,
    fallback: DatasetTable,
    metrics: Option<Arc<MetricsRecorder>>,
    logger: LogManager,
}

impl<S: DatasetSource> DatasetProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            fallback: fallback_table(),
            metrics: None,
            logger: LogManager::new("dataset"),
        }
    }

    pub fn with_fallback(mut self, fallback: DatasetTable) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn fetch(&self, month: &str, year: &str) -> Vec<MetricRecord> {
        self.fetch_dataset(month, year).await.records
    }

    pub async fn fetch_dataset(&self, month: &str, year: &str) -> PeriodDataset {
        let key = dataset_key(month, year);
        self.logger
            .trace(&format!("loading data for {}/{}", month, year));

        match self.source.load().await {
            Ok(table) => {
                if let Some(records) = table.period(&key) {
                    return PeriodDataset {
                        records: records.to_vec(),
                        origin: DatasetOrigin::Live,
                    };
                }
                self.logger
                    .warn(&format!("no data found for {}, using fallback data", key));
            }
            Err(err) => {
                log::error!("error loading monthly data for {}: {}", key, err);
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_fallback();
        }
        PeriodDataset {
            records: fallback_for(&self.fallback, &key),
            origin: DatasetOrigin::Fallback,
        }
    }

    /// Fetches the records for a stamped period request.
    pub async fn resolve(&self, request: PeriodRequest) -> PeriodLoaded {
        let records = self
            .fetch(&request.time_point.month, &request.time_point.year)
            .await;
        PeriodLoaded {
            token: request.token,
            time_point: request.time_point,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn network_failure_serves_november_fallback() {
        let provider = DatasetProvider::new(UnavailableSource);
        let records = provider.fetch("11", "2024").await;
        assert_eq!(records.len(), 7);
        let nyc = records.iter().find(|r| r.city_id == "nyc").unwrap();
        assert_eq!(nyc.visitors, 850_000);
    }

    #[tokio::test]
    async fn live_table_wins_when_key_present() {
        let mut table = DatasetTable::new();
        table.insert(
            "11-2024",
            vec![MetricRecord::new("nyc", "New York City", 1, 2.0, 3.0, 4.0)],
        );
        let provider = DatasetProvider::new(StaticSource::new(table));
        let dataset = provider.fetch_dataset("11", "2024").await;
        assert_eq!(dataset.origin, DatasetOrigin::Live);
        assert_eq!(dataset.records.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_falls_back_and_is_counted() {
        let metrics = Arc::new(MetricsRecorder::new());
        let provider =
            DatasetProvider::new(StaticSource::default()).with_metrics(metrics.clone());
        let dataset = provider.fetch_dataset("12", "2024").await;
        assert_eq!(dataset.origin, DatasetOrigin::Fallback);
        assert_eq!(dataset.records[0].visitors, 1_200_000);
        assert_eq!(metrics.snapshot().fallbacks_served, 1);
    }

    #[tokio::test]
    async fn malformed_file_falls_back() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"{ not json").unwrap();
        let provider = DatasetProvider::new(JsonFileSource::new(temp.path()));
        let dataset = provider.fetch_dataset("01", "2025").await;
        assert_eq!(dataset.origin, DatasetOrigin::Fallback);
        assert_eq!(dataset.records[0].visitors, 720_000);
    }

    #[tokio::test]
    async fn json_file_is_read_by_key() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            br#"{"11-2024":[{"city_id":"miami","city_name":"Miami","visitors":42,
                "revenue":1.0,"satisfaction":4.0,"avg_stay":2.0}]}"#,
        )
        .unwrap();
        let provider = DatasetProvider::new(JsonFileSource::new(temp.path()));
        let records = provider.fetch("11", "2024").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].city_id, "miami");
    }
}
