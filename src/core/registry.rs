use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// The scan families that hold an exclusive guard while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    BlockHoles,
    SearchHoles,
    DbHoles,
    TrxValidation,
}

impl ScanKind {
    const ALL: [ScanKind; 4] = [
        ScanKind::BlockHoles,
        ScanKind::SearchHoles,
        ScanKind::DbHoles,
        ScanKind::TrxValidation,
    ];

    fn index(self) -> usize {
        match self {
            ScanKind::BlockHoles => 0,
            ScanKind::SearchHoles => 1,
            ScanKind::DbHoles => 2,
            ScanKind::TrxValidation => 3,
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanKind::BlockHoles => "block_holes",
            ScanKind::SearchHoles => "search_holes",
            ScanKind::DbHoles => "db_holes",
            ScanKind::TrxValidation => "trx_validation",
        };
        f.write_str(name)
    }
}

/// At most one scan of each kind runs at a time. A second request for a
/// running kind is refused immediately instead of queued; the caller tells
/// the client to retry later.
#[derive(Default)]
pub struct ScanRegistry {
    running: [AtomicBool; 4],
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to claim the guard for `kind`. `None` means a scan of that
    /// kind is already in flight.
    pub fn try_acquire(self: &Arc<Self>, kind: ScanKind) -> Option<ScanPermit> {
        let claimed = self.running[kind.index()]
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !claimed {
            return None;
        }
        info!("🔒 scan guard acquired: {kind}");
        Some(ScanPermit {
            registry: Arc::clone(self),
            kind,
        })
    }

    pub fn is_running(&self, kind: ScanKind) -> bool {
        self.running[kind.index()].load(Ordering::SeqCst)
    }

    pub fn running_kinds(&self) -> Vec<ScanKind> {
        ScanKind::ALL
            .into_iter()
            .filter(|&kind| self.is_running(kind))
            .collect()
    }
}

/// RAII guard for a running scan. Dropping it releases the slot, so every
/// exit path of a scan, error or cancellation included, frees the kind.
pub struct ScanPermit {
    registry: Arc<ScanRegistry>,
    kind: ScanKind,
}

impl ScanPermit {
    pub fn kind(&self) -> ScanKind {
        self.kind
    }
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.registry.running[self.kind.index()].store(false, Ordering::SeqCst);
        info!("🔓 scan guard released: {}", self.kind);
    }
}
