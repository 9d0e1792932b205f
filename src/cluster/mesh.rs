use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{DmeshConfig, PeerSeed};
use crate::core::driver::{CancelSignal, EventSink};
use crate::core::types::{OutboundEvent, Peer, PeerEvent, PeerEventName};

/// Streams the state of the search mesh to a connected viewer.
///
/// Peers come from configuration. Each stream opens with one `sync` event
/// per peer, then keeps the viewer current with periodic `update` events
/// carrying the peer's reachability.
pub struct MeshObserver {
    client: reqwest::Client,
    config: DmeshConfig,
    started_at: DateTime<Utc>,
}

impl MeshObserver {
    pub fn new(config: DmeshConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            started_at: Utc::now(),
        })
    }

    /// Runs until the viewer goes away.
    pub async fn stream(&self, sink: &dyn EventSink, cancel: &CancelSignal) {
        info!(
            "🔭 mesh stream opened, {} configured peer(s)",
            self.config.peers.len()
        );

        for seed in &self.config.peers {
            sink.emit(self.event(seed, PeerEventName::Sync, true));
        }

        loop {
            if !self.wait_one_interval(cancel).await {
                debug!("mesh stream viewer gone, stopping");
                return;
            }
            for seed in &self.config.peers {
                if cancel.is_cancelled() {
                    return;
                }
                let ready = self.probe(seed).await;
                sink.emit(self.event(seed, PeerEventName::Update, ready));
            }
        }
    }

    /// Sleeps one poll interval in short ticks so a dropped viewer is
    /// noticed quickly. Returns false when cancelled.
    async fn wait_one_interval(&self, cancel: &CancelSignal) -> bool {
        let mut remaining_millis = self.config.poll_interval_secs.max(1) * 1_000;
        while remaining_millis > 0 {
            if cancel.is_cancelled() {
                return false;
            }
            let tick = remaining_millis.min(250);
            tokio::time::sleep(Duration::from_millis(tick)).await;
            remaining_millis -= tick;
        }
        !cancel.is_cancelled()
    }

    async fn probe(&self, seed: &PeerSeed) -> bool {
        let url = format!("{}/healthz", seed.host.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("peer {} unreachable: {err}", seed.key);
                false
            }
        }
    }

    fn event(&self, seed: &PeerSeed, name: PeerEventName, ready: bool) -> OutboundEvent {
        OutboundEvent::PeerEvent(PeerEvent {
            event_name: name,
            peer_key: format!("{}/search/{}", self.config.service_version, seed.key),
            peer: Peer {
                host: seed.host.clone(),
                tier: seed.tier,
                boot: self.started_at,
                first_block_num: seed.first_block_num,
                irr_block_num: 0,
                head_block_num: 0,
                shard_size: seed.shard_size,
                ready,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::test_support::VecSink;

    fn seed(key: &str, host: &str) -> PeerSeed {
        PeerSeed {
            key: key.to_string(),
            host: host.to_string(),
            tier: 1,
            first_block_num: 0,
            shard_size: 5_000,
        }
    }

    #[tokio::test]
    async fn stream_opens_with_one_sync_event_per_peer() {
        let config = DmeshConfig {
            peers: vec![seed("a1", "http://search-a1"), seed("b2", "http://search-b2")],
            ..DmeshConfig::default()
        };
        let observer = MeshObserver::new(config).unwrap();
        let sink = VecSink::new();
        let cancel = CancelSignal::new();
        cancel.cancel();

        observer.stream(&sink, &cancel).await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        for (event, key) in events.iter().zip(["v1/search/a1", "v1/search/b2"]) {
            match event {
                OutboundEvent::PeerEvent(peer_event) => {
                    assert_eq!(peer_event.event_name, PeerEventName::Sync);
                    assert_eq!(peer_event.peer_key, key);
                    assert!(peer_event.peer.ready);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
