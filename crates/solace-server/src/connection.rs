//! Per-socket session loop: decodes client events, dispatches them to
//! the gateway, and drains outbound events back to the peer.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use solace_core::{Gateway, OutboundSink};
use solace_protocol::{ClientEvent, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound sink backed by the connection's unbounded channel.
///
/// `send` never blocks; the writer task drains the channel onto the
/// socket. Once the peer is gone the channel is closed and events are
/// dropped, matching the registry's drop-don't-queue contract.
struct ChannelSink {
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl OutboundSink for ChannelSink {
    fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Drive one WebSocket connection until it closes.
pub(crate) async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let connection_id = Uuid::new_v4();
    debug!("socket opened (connection_id={})", connection_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (sender, mut receiver) = mpsc::unbounded_channel::<ServerEvent>();
    let sink: Arc<dyn OutboundSink> = Arc::new(ChannelSink { sender });

    let writer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let encoded = match serde_json::to_string(&event) {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!("failed to encode outbound event: {err}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(encoded.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => {
                let event: ClientEvent = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(err) => {
                        debug!(
                            "ignoring malformed client event (connection_id={}): {err}",
                            connection_id
                        );
                        continue;
                    }
                };
                gateway.handle_event(connection_id, sink.clone(), event).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    gateway.handle_disconnect(connection_id);
    writer.abort();
    debug!("socket closed (connection_id={})", connection_id);
}
