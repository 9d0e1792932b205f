use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use axum::Json;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::api::channel::LiveChannel;
use crate::api::{AppState, ServiceInfo};
use crate::cluster::HealthReport;
use crate::core::driver::{
    CancelSignal, EventSink, PositionSpace, RowScanSource, ScanDriver, ScanStats, StoreWalkSource,
};
use crate::core::partition::trx_row_ranges;
use crate::core::registry::ScanKind;
use crate::core::tracker::SequenceTracker;
use crate::core::types::{Message, OutboundEvent, Progress, Transaction};
use crate::kvdb::schema::keys;
use crate::kvdb::{KeyRange, RowStore};
use crate::store::BlockStore;
use crate::store::fs::FsBlockStore;
use crate::utils::format::format_duration;

/// Archive files are named by their first block, zero-padded to ten digits.
static BLOCK_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{10})").expect("hard-coded pattern"));

/// Index shards are `<prefix>/<start-block>.bleve.tar.{zst,gz}`.
static SHARD_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*/(\d+)\.bleve\.tar\.(zst|gz)$").expect("hard-coded pattern"));

pub async fn config(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(state.info.as_ref().clone())
}

pub async fn services_health_checks(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.cluster.check_all().await)
}

pub async fn block_holes(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_block_holes(state, socket))
}

async fn run_block_holes(state: AppState, socket: WebSocket) {
    let channel = LiveChannel::start(socket);
    let Some(_permit) = state.registry.try_acquire(ScanKind::BlockHoles) else {
        refuse(&channel, ScanKind::BlockHoles);
        return;
    };

    info!("🔍 block holes scan started");
    let cfg = &state.config.blocks_store;
    let mut source = StoreWalkSource::new(
        Arc::clone(&state.blocks_store),
        "",
        BLOCK_FILE_PATTERN.clone(),
    );
    let mut tracker = SequenceTracker::new(u64::from(cfg.file_step), cfg.checkpoint_every);
    let driver = ScanDriver::new(cfg.progress_every, PositionSpace::Direct);

    finish(
        ScanKind::BlockHoles,
        driver
            .run(&mut source, &mut tracker, &channel, &channel.cancel_signal())
            .await,
        &channel,
    );
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchHolesParams {
    /// Overrides the configured shard size for this scan.
    pub shard_size: Option<u32>,
    /// Scans a different index store than the configured one.
    pub indexes_url: Option<String>,
}

pub async fn search_holes(
    ws: WebSocketUpgrade,
    Query(params): Query<SearchHolesParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| run_search_holes(state, params, socket))
}

async fn run_search_holes(state: AppState, params: SearchHolesParams, socket: WebSocket) {
    let channel = LiveChannel::start(socket);
    let Some(_permit) = state.registry.try_acquire(ScanKind::SearchHoles) else {
        refuse(&channel, ScanKind::SearchHoles);
        return;
    };

    let cfg = &state.config.search_store;
    let shard_size = params.shard_size.unwrap_or(cfg.shard_size);
    let shard_prefix = format!("shards-{shard_size}/");
    let store = match resolve_search_store(&state.search_store, params.indexes_url.as_deref()) {
        Ok(store) => store,
        Err(err) => {
            error!("search holes store unavailable: {err:#}");
            channel.emit(OutboundEvent::Message(Message::new(format!(
                "cannot open index store: {err:#}"
            ))));
            return;
        }
    };
    info!("🔍 search holes scan started (shard size {shard_size})");

    let mut source = StoreWalkSource::new(store, shard_prefix, SHARD_FILE_PATTERN.clone());
    let mut tracker = SequenceTracker::new(u64::from(shard_size), cfg.checkpoint_every);
    let driver = ScanDriver::new(cfg.progress_every, PositionSpace::Direct);

    finish(
        ScanKind::SearchHoles,
        driver
            .run(&mut source, &mut tracker, &channel, &channel.cancel_signal())
            .await,
        &channel,
    );
}

/// Picks the index store to scan: the shared one, or a caller-supplied
/// location opened just for this request.
fn resolve_search_store(
    shared: &Arc<dyn BlockStore>,
    indexes_url: Option<&str>,
) -> anyhow::Result<Arc<dyn BlockStore>> {
    match indexes_url {
        None => Ok(Arc::clone(shared)),
        Some(url) => {
            info!("📂 scanning caller-supplied index store: {url}");
            Ok(Arc::new(FsBlockStore::new(url)?))
        }
    }
}

pub async fn search_peers(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_search_peers(state, socket))
}

/// Streams mesh peer events until the viewer disconnects. Unlike the hole
/// scans this is a passive view, so any number of viewers may watch at once.
async fn run_search_peers(state: AppState, socket: WebSocket) {
    let channel = LiveChannel::start(socket);
    state
        .mesh
        .stream(&channel, &channel.cancel_signal())
        .await;
}

pub async fn db_holes(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_db_holes(state, socket))
}

async fn run_db_holes(state: AppState, socket: WebSocket) {
    let channel = LiveChannel::start(socket);
    let Some(_permit) = state.registry.try_acquire(ScanKind::DbHoles) else {
        refuse(&channel, ScanKind::DbHoles);
        return;
    };
    let Some(row_store) = state.row_store.clone() else {
        channel.emit(OutboundEvent::Message(Message::new(
            "chain database is unavailable",
        )));
        return;
    };

    info!("🔍 db holes scan started ({})", state.chain.protocol);
    let cfg = &state.config.kvdb;
    let mut source = RowScanSource::new(row_store, state.chain);
    // Row scans step one block at a time over inverted keys.
    let mut tracker = SequenceTracker::new(1, cfg.checkpoint_every);
    let driver = ScanDriver::new(cfg.progress_every, PositionSpace::InvertedU32);

    finish(
        ScanKind::DbHoles,
        driver
            .run(&mut source, &mut tracker, &channel, &channel.cancel_signal())
            .await,
        &channel,
    );
}

pub async fn trx_validation(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_trx_validation(state, socket))
}

/// Fans the trx table out over keyspace partitions and streams every index
/// row that never got its written marker.
async fn run_trx_validation(state: AppState, socket: WebSocket) {
    let channel = Arc::new(LiveChannel::start(socket));
    let Some(_permit) = state.registry.try_acquire(ScanKind::TrxValidation) else {
        refuse(channel.as_ref(), ScanKind::TrxValidation);
        return;
    };
    let Some(row_store) = state.row_store.clone() else {
        channel.emit(OutboundEvent::Message(Message::new(
            "chain database is unavailable",
        )));
        return;
    };

    let concurrency = state.config.kvdb.trx_concurrency;
    let ranges = trx_row_ranges(concurrency);
    info!(
        "🔍 trx validation scan started ({} ranges, concurrency {concurrency})",
        ranges.len()
    );

    let started_at = Instant::now();
    channel.emit(OutboundEvent::Progress(Progress { elapsed: 0 }));

    let cancel = channel.cancel_signal();
    let workers = num_cpus::get().saturating_sub(1).clamp(1, 16);
    let semaphore = Arc::new(Semaphore::new(workers));
    let failed = Arc::new(AtomicBool::new(false));
    let flagged = Arc::new(AtomicU64::new(0));
    let written_column = state.chain.trx_written_column;

    let mut tasks = JoinSet::new();
    for range in ranges {
        channel.emit(OutboundEvent::Message(Message::new(format!(
            "processing range starting at {:?}",
            range.start
        ))));

        let semaphore = Arc::clone(&semaphore);
        let failed = Arc::clone(&failed);
        let flagged = Arc::clone(&flagged);
        let cancel = cancel.clone();
        let channel = Arc::clone(&channel);
        let row_store = Arc::clone(&row_store);
        tasks.spawn(async move {
            let Ok(_slot) = semaphore.acquire().await else {
                return;
            };
            // An earlier failure or a client hangup skips partitions that
            // have not started yet; in-flight partitions run to completion.
            if failed.load(Ordering::SeqCst) || cancel.is_cancelled() {
                return;
            }
            if let Err(err) = scan_trx_range(
                &row_store,
                &range,
                written_column,
                channel.as_ref(),
                &flagged,
                &cancel,
            )
            .await
            {
                error!("trx range {:?} failed: {err:#}", range.start);
                channel.emit(OutboundEvent::Message(Message::new(format!(
                    "range starting at {:?} failed: {err:#}",
                    range.start
                ))));
                failed.store(true, Ordering::SeqCst);
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    channel.emit(OutboundEvent::Progress(Progress {
        elapsed: started_at.elapsed().as_millis() as u64,
    }));
    info!(
        flagged = flagged.load(Ordering::SeqCst),
        "🏁 trx validation scan finished"
    );
}

async fn scan_trx_range(
    row_store: &Arc<dyn RowStore>,
    range: &KeyRange,
    written_column: &str,
    sink: &dyn EventSink,
    flagged: &AtomicU64,
    cancel: &CancelSignal,
) -> anyhow::Result<()> {
    row_store
        .scan_rows(range, true, &mut |row| {
            if cancel.is_cancelled() {
                return false;
            }
            let Some((trx_id, block_num)) = keys::decode_trx_key(&row.key) else {
                return true;
            };
            if !row.columns.iter().any(|column| column == written_column) {
                flagged.fetch_add(1, Ordering::Relaxed);
                sink.emit(OutboundEvent::Transaction(Transaction {
                    prefix: trx_id[..8].to_string(),
                    id: trx_id.to_string(),
                    block_num,
                }));
            }
            true
        })
        .await
}

fn refuse(channel: &LiveChannel, kind: ScanKind) {
    info!("⛔ refused {kind} scan, already running");
    channel.emit(OutboundEvent::Message(Message::new(format!(
        "a {kind} scan is already running, try again later"
    ))));
}

fn finish(kind: ScanKind, result: anyhow::Result<ScanStats>, channel: &LiveChannel) {
    match result {
        Ok(stats) => info!(
            observations = stats.observations,
            cancelled = stats.cancelled,
            elapsed = %format_duration(stats.elapsed),
            "🏁 {kind} scan finished"
        ),
        Err(err) => {
            error!("{kind} scan failed: {err:#}");
            channel.emit(OutboundEvent::Message(Message::new(format!(
                "{kind} scan failed: {err:#}"
            ))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn shared_store(dir: &TempDir) -> Arc<dyn BlockStore> {
        Arc::new(FsBlockStore::new(dir.path()).unwrap())
    }

    #[test]
    fn search_store_defaults_to_the_shared_one() {
        let dir = TempDir::new().unwrap();
        let shared = shared_store(&dir);

        let resolved = resolve_search_store(&shared, None).unwrap();
        assert!(Arc::ptr_eq(
            &resolved,
            &shared,
        ));
    }

    #[test]
    fn indexes_url_override_opens_a_fresh_store() {
        let dir = TempDir::new().unwrap();
        let shared = shared_store(&dir);

        let other = TempDir::new().unwrap();
        fs::write(other.path().join("0000005000.bleve.tar.zst"), b"").unwrap();
        let url = other.path().to_string_lossy().into_owned();

        let resolved = resolve_search_store(&shared, Some(&url)).unwrap();
        assert!(!Arc::ptr_eq(&resolved, &shared));
        assert_eq!(
            resolved.list("", 10).unwrap(),
            vec!["0000005000.bleve.tar.zst".to_string()]
        );
    }

    #[test]
    fn missing_indexes_url_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let shared = shared_store(&dir);

        let err = resolve_search_store(&shared, Some("/no/such/store")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
