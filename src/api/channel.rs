use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::driver::{CancelSignal, EventSink};
use crate::core::types::OutboundEvent;

/// One WebSocket bound to one scan.
///
/// Events are queued through an unbounded channel and written by a dedicated
/// task, so scans emit without awaiting the socket. A reader task watches the
/// client side: any close, error, or dropped connection trips the shared
/// [`CancelSignal`], which the scan observes within one observation.
pub struct LiveChannel {
    sender: mpsc::UnboundedSender<OutboundEvent>,
    cancel: CancelSignal,
}

impl LiveChannel {
    pub fn start(socket: WebSocket) -> Self {
        let (mut ws_writer, mut ws_reader) = socket.split();
        let (sender, mut queue) = mpsc::unbounded_channel::<OutboundEvent>();
        let cancel = CancelSignal::new();

        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(event) = queue.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("failed to serialize outbound event: {err}");
                        continue;
                    }
                };
                if ws_writer.send(WsMessage::Text(text.into())).await.is_err() {
                    // Peer is gone; stop the scan feeding us.
                    writer_cancel.cancel();
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        // Inbound payloads are ignored; the read loop only exists to notice
        // the connection dying.
        let reader_cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(received) = ws_reader.next().await {
                match received {
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    Ok(other) => debug!("ignoring inbound ws payload: {other:?}"),
                }
            }
            reader_cancel.cancel();
        });

        Self { sender, cancel }
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }
}

impl EventSink for LiveChannel {
    /// Fire and forget: a closed channel means the writer task already shut
    /// down, and the cancel flag stops the scan shortly after.
    fn emit(&self, event: OutboundEvent) {
        let _ = self.sender.send(event);
    }
}
