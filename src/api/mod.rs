pub mod channel;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use serde::Serialize;

use crate::chains::{ChainSpec, Protocol};
use crate::cluster::ClusterHealth;
use crate::cluster::mesh::MeshObserver;
use crate::config::AppConfig;
use crate::core::registry::ScanRegistry;
use crate::kvdb::RowStore;
use crate::store::BlockStore;

/// Static service identity returned by `/api/v1/config`, mirrored from the
/// loaded configuration so the frontend can label what it is diagnosing.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub block_store_url: String,
    pub indexes_store_url: String,
    pub shard_size: u32,
    pub kvdb_connection_info: String,
    pub dmesh_service_version: String,
}

impl ServiceInfo {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            protocol: config.diagnose.protocol,
            namespace: config.diagnose.namespace.clone(),
            block_store_url: config.blocks_store.path.clone(),
            indexes_store_url: config.search_store.path.clone(),
            shard_size: config.search_store.shard_size,
            kvdb_connection_info: config.kvdb.path.clone(),
            dmesh_service_version: config.dmesh.service_version.clone(),
        }
    }
}

/// Everything a request handler needs, shared across the router.
#[derive(Clone)]
pub struct AppState {
    pub info: Arc<ServiceInfo>,
    pub config: Arc<AppConfig>,
    pub blocks_store: Arc<dyn BlockStore>,
    pub search_store: Arc<dyn BlockStore>,
    /// `None` when the chain database could not be opened; db scans then
    /// answer with an explanatory message instead of failing the upgrade.
    pub row_store: Option<Arc<dyn RowStore>>,
    pub chain: &'static ChainSpec,
    pub registry: Arc<ScanRegistry>,
    pub cluster: Arc<ClusterHealth>,
    pub mesh: Arc<MeshObserver>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/config", get(handlers::config))
        .route(
            "/api/v1/services_health_checks",
            get(handlers::services_health_checks),
        )
        .route("/api/v1/block_holes", get(handlers::block_holes))
        .route("/api/v1/search_holes", get(handlers::search_holes))
        .route("/api/v1/search_peers", get(handlers::search_peers))
        .route("/api/v1/db_holes", get(handlers::db_holes))
        .route("/api/v1/trx_validation", get(handlers::trx_validation))
        .with_state(state)
}
