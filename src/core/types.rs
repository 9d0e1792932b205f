use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a reported block range.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RangeStatus {
    Valid,
    Hole,
}

/// A closed, inclusive range of block numbers reported by a scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockRange {
    pub start_block: u32,
    pub end_block: u32,
    pub message: String,
    pub status: RangeStatus,
}

impl BlockRange {
    pub fn valid(start_block: u32, end_block: u32, message: impl Into<String>) -> Self {
        Self {
            start_block,
            end_block,
            message: message.into(),
            status: RangeStatus::Valid,
        }
    }

    pub fn hole(start_block: u32, end_block: u32, message: impl Into<String>) -> Self {
        Self {
            start_block,
            end_block,
            message: message.into(),
            status: RangeStatus::Hole,
        }
    }
}

/// Liveness heartbeat for long scans. Elapsed wall time in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: u64,
}

/// One transaction index row surfaced by the validation scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub prefix: String,
    pub id: String,
    pub block_num: u32,
}

/// One search peer of the deployment mesh, shaped the way the operator
/// frontend renders it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub host: String,
    pub tier: u32,
    pub boot: DateTime<Utc>,
    pub first_block_num: u32,
    pub irr_block_num: u32,
    pub head_block_num: u32,
    pub shard_size: u32,
    pub ready: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PeerEventName {
    Sync,
    Update,
    Delete,
}

/// Lifecycle event for one mesh peer. The payload keys are capitalized,
/// unlike the rest of the protocol; the mesh page depends on them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PeerEvent {
    #[serde(rename = "EventName")]
    pub event_name: PeerEventName,
    #[serde(rename = "PeerKey")]
    pub peer_key: String,
    #[serde(rename = "Peer")]
    pub peer: Peer,
}

/// Free-form informational message (errors, guard rejections, worker status).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Typed outbound envelope, serialized as `{"type": ..., "payload": ...}`.
///
/// One live channel multiplexes every event kind a scan can produce, so the
/// client never needs more than a single WebSocket per scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundEvent {
    BlockRange(BlockRange),
    Progress(Progress),
    Transaction(Transaction),
    Message(Message),
    PeerEvent(PeerEvent),
}
