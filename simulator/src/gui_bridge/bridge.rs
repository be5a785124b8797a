use crate::gui_bridge::model::VisualizationModel;
use anyhow::Result;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    thread,
};
use tokio::runtime::Builder;
use tourcore::model::DatasetTable;
use warp::{http::StatusCode, Filter};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Serves the latest session snapshot and the monthly dataset over HTTP.
///
/// `GET /payload` returns the snapshot, `GET /dataset` the table the
/// visualizer loads, `POST /dataset` replaces that table.
pub struct GuiBridge {
    state: Arc<RwLock<VisualizationModel>>,
    dataset: Arc<RwLock<DatasetTable>>,
}

impl GuiBridge {
    /// Bridge without a listener; only publishing and snapshots.
    pub fn detached(dataset: DatasetTable) -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::default())),
            dataset: Arc::new(RwLock::new(dataset)),
        }
    }

    pub fn serve(address: SocketAddr, dataset: DatasetTable) -> Self {
        let bridge = Self::detached(dataset);
        let state = bridge.state.clone();
        let dataset = bridge.dataset.clone();
        let state_filter = warp::any().map(move || state.clone());
        let dataset_filter = warp::any().map(move || dataset.clone());

        let payload_route = warp::path("payload")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<VisualizationModel>>| warp::reply::json(&*read(&state)));

        let dataset_route = warp::path("dataset")
            .and(warp::get())
            .and(dataset_filter.clone())
            .map(|dataset: Arc<RwLock<DatasetTable>>| warp::reply::json(&*read(&dataset)));

        let ingest_route = warp::path("dataset")
            .and(warp::post())
            .and(warp::body::json())
            .and(dataset_filter)
            .map(|table: DatasetTable, dataset: Arc<RwLock<DatasetTable>>| {
                let periods = table.len();
                *write(&dataset) = table;
                log::info!("[bridge] dataset replaced with {} periods", periods);
                warp::reply::with_status(
                    warp::reply::json(&json!({"status": "ok", "periods": periods})),
                    StatusCode::OK,
                )
            });

        thread::spawn(move || {
            let routes = payload_route.or(dataset_route).or(ingest_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    log::error!("[bridge] failed to build runtime: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                log::info!("[bridge] listening on http://{}", address);
                warp::serve(routes).run(address).await;
            });
        });

        bridge
    }

    pub fn publish(&self, model: &VisualizationModel) -> Result<()> {
        let mut guard = write(&self.state);
        *guard = model.clone();
        log::info!(
            "[bridge] period {:?}, mode {:?}, markers {}, flows {}",
            guard.period_label,
            guard.mode,
            guard.markers.len(),
            guard.flows.len()
        );
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        read(&self.state).clone()
    }

    #[cfg(test)]
    pub fn dataset(&self) -> DatasetTable {
        read(&self.dataset).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SessionConfig;
    use crate::workflow::runner::SessionRunner;
    use tourcore::dataset::fallback_table;

    #[tokio::test(start_paused = true)]
    async fn gui_bridge_updates_state() {
        let cfg = SessionConfig {
            steps: Vec::new(),
            ..SessionConfig::from_args(3000, Vec::new(), None)
        };
        let report = SessionRunner::new(cfg).run().await.unwrap();
        let gui = GuiBridge::detached(fallback_table());
        gui.publish(&report.model).unwrap();
        let snapshot = gui.snapshot();
        assert_eq!(snapshot.markers.len(), 10);
        assert_eq!(snapshot.period_label.as_deref(), Some("November 2024"));
        assert_eq!(gui.dataset().len(), 4);
    }
}
