//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::ws::{BATCH_INTERVAL, BATCH_MAX_SIZE, RATE_LIMITER_MILLIS, TIMEOUT_DURATION_SECONDS};
use crate::{
    AppState,
    dtos::{ClientFrame, RelayEnvelope},
    ws::{event_handlers::process_client_frame, usermap::InternalSignal},
};
use axum::extract::ws::Utf8Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::Duration;
use tokio::time::{interval, timeout};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: i64) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale interno: il relay pubblica qui gli eventi diretti all'utente
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    state.relay.users.register_online(user_id, int_tx.clone());
    state.presence.ping(user_id, true);

    tokio::spawn(listen_ws(user_id, ws_rx, int_tx, state.clone()));
    tokio::spawn(write_ws(user_id, ws_tx, int_rx, state));
}

#[instrument(skip(websocket_tx, internal_rx, state))]
pub async fn write_ws(
    user_id: i64,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Write task started");

    let chat_ids = match state.participant.find_active_chat_ids(user_id).await {
        Ok(ids) => {
            debug!(chat_count = ids.len(), "User chats loaded");
            ids
        }
        Err(e) => {
            error!("Failed to load user chats: {:?}", e);
            return;
        }
    };

    let mut stream_map = StreamMap::new();
    for (rx, chat_id) in state
        .relay
        .chats
        .subscribe_multiple(&chat_ids)
        .into_iter()
        .zip(chat_ids)
    {
        stream_map.insert(chat_id, BroadcastStream::new(rx));
    }

    let mut batch: Vec<Arc<RelayEnvelope>> = Vec::new();
    let mut interval = interval(Duration::from_millis(BATCH_INTERVAL));
    interval.tick().await; // Consuma primo tick immediato

    'external: loop {
        tokio::select! {
            Some((_, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                // un receiver in ritardo perde eventi: il client ricarica comunque via HTTP
                if let Ok(envelope) = result {
                    batch.push(envelope);
                }
            }

            // invia anche se il batch non è arrivato a BATCH_MAX_SIZE
            _ = interval.tick() => {
                if !batch.is_empty() {
                    if send_batch(&mut websocket_tx, &batch).await.is_err() {
                        warn!("Failed to send batch on interval, closing connection");
                        break 'external;
                    }
                    debug!(batch_size = batch.len(), "Batch sent on interval");
                    batch.clear();
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) | None => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::AddChat(chat_id)) => {
                        debug!(chat_id, "Adding chat subscription");
                        let rx = state.relay.chats.subscribe(chat_id);
                        stream_map.insert(chat_id, BroadcastStream::new(rx));
                    }
                    Some(InternalSignal::RemoveChat(chat_id)) => {
                        debug!(chat_id, "Removing chat subscription");
                        stream_map.remove(&chat_id);
                    }
                    Some(InternalSignal::Event(envelope)) => {
                        batch.push(envelope);
                    }
                }
            }
        }

        if batch.len() >= BATCH_MAX_SIZE {
            if send_batch(&mut websocket_tx, &batch).await.is_err() {
                warn!("Failed to send batch, closing connection");
                break 'external;
            }
            debug!(batch_size = batch.len(), "Batch sent");
            batch.clear();
        }
    }

    // Invia batch finale prima di terminare
    if !batch.is_empty() {
        let _ = send_batch(&mut websocket_tx, &batch).await;
    }
    let _ = websocket_tx.close().await;

    info!("Write task terminated");
}

#[instrument(skip(websocket_tx, batch), fields(size = batch.len()))]
async fn send_batch(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    batch: &[Arc<RelayEnvelope>],
) -> Result<(), axum::Error> {
    let events: Vec<&RelayEnvelope> = batch.iter().map(|e| e.as_ref()).collect();
    let json = serde_json::to_string(&events).map_err(|e| {
        error!("Failed to serialize batch: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send batch through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip(websocket_rx, internal_tx, state))]
pub async fn listen_ws(
    user_id: i64,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Listen task started");

    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));
    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, StreamExt::next(&mut websocket_rx)).await {
            Ok(Some(msg_result)) => {
                rate_limiter.tick().await;

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("WebSocket error: {:?}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => process_client_frame(&state, user_id, frame),
                        Err(_) => warn!("Failed to deserialize client frame"),
                    },
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = TIMEOUT_DURATION_SECONDS, "Connection timeout");
                break;
            }
        }
    }

    // Cleanup
    let _ = internal_tx.send(InternalSignal::Shutdown);
    state.relay.users.remove_if_same(user_id, &internal_tx);
    // un socket che ha sostituito questo tiene l'utente online
    if !state.relay.users.is_user_online(user_id) {
        state.presence.ping(user_id, false);
    }
    info!("Listen task terminated");
}
