//! Connection driver (C8): the per-connection protocol state machine.
//!
//! Generalizes the teacher's `handle_socket`/`handle_client_message` pair
//! down to the three in-scope verbs. The teacher's extra branches (NIP-42
//! AUTH, NIP-77 negentropy, NIP-86 management RPC) are out of spec scope
//! (see Non-goals) and are not carried over.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::pool::{Connection, ConnectionPool};
use crate::relay::RelayService;
use crate::wire::{ClientMessage, ServerMessage};

/// Drives one WebSocket connection end to end: registers with the pool,
/// runs the read loop against a serialized writer task, and tears down on
/// disconnect.
pub async fn handle_socket(socket: WebSocket, relay: Arc<RelayService>, pool: Arc<ConnectionPool>) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();

    let (writer_tx, mut writer_rx) = mpsc::channel::<String>(128);
    pool.add(Connection::new(conn_id.clone(), writer_tx));

    let conn_id_for_writer = conn_id.clone();
    let mut writer_task = tokio::spawn(async move {
        while let Some(frame) = writer_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame)).await {
                warn!(connection_id = %conn_id_for_writer, error = %e, "write failed, closing connection");
                break;
            }
        }
        let _ = sink.close().await;
    });

    info!(connection_id = %conn_id, "connection opened");

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                dispatch(&conn_id, &text, &relay, &pool).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {
                // Ping/Pong/Binary frames carry no protocol meaning here.
            }
            Some(Err(e)) => {
                warn!(connection_id = %conn_id, error = %e, "transport error, tearing down connection");
                break;
            }
        }
    }

    relay.handle_disconnect(&conn_id);
    writer_task.abort();
    info!(connection_id = %conn_id, "connection closed");
}

async fn dispatch(conn_id: &str, text: &str, relay: &RelayService, pool: &ConnectionPool) {
    match ClientMessage::decode(text) {
        Ok(ClientMessage::Event(event)) => {
            relay.handle_event(conn_id, *event).await;
        }
        Ok(ClientMessage::Req {
            subscription_id,
            filters,
        }) => {
            relay.handle_req(conn_id, subscription_id, filters).await;
        }
        Ok(ClientMessage::Close { subscription_id }) => {
            relay.handle_close(conn_id, &subscription_id);
        }
        Err(e) => {
            let notice = ServerMessage::Notice {
                message: e.wire_message(),
            }
            .encode();
            pool.send_to(conn_id, notice);
        }
    }
}
