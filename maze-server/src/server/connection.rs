//! One WebSocket connection: register, read, dispatch, tear down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::ServerState;

/// Replies buffered per connection before job tasks wait on the writer.
const OUTBOUND_BUFFER: usize = 32;

/// Drive a connection until the client goes away.
///
/// Messages are handed to the dispatcher in the order they arrive. On close
/// the session waits for its jobs, and only then is the disconnect recorded,
/// so no job activity for a session is logged after its disconnect. When the
/// server shuts down, pending replies are still delivered before the socket
/// is closed.
pub(super) async fn handle_connection(socket: WebSocket, state: Arc<ServerState>) {
    let id = state.registry.register();
    tracing::info!(session = %id, live = state.registry.len(), "client connected");

    let (mut sink, mut stream) = socket.split();
    let (outbound, mut replies) = mpsc::channel::<Vec<u8>>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(payload) = replies.recv().await {
            let message = match String::from_utf8(payload) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => Message::Binary(e.into_bytes().into()),
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let session = state.dispatcher.open_session(id.clone(), outbound);

    let server_stopping = loop {
        let frame = tokio::select! {
            () = state.shutdown.cancelled() => break true,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                state.dispatcher.handle_message(&session, text.as_str().as_bytes());
            }
            Some(Ok(Message::Binary(bytes))) => {
                state.dispatcher.handle_message(&session, &bytes);
            }
            Some(Ok(Message::Close(_))) | None => break false,
            // Pings are answered by axum.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Err(e)) => {
                tracing::debug!(session = %id, error = %e, "connection read failed");
                break false;
            }
        }
    };

    if server_stopping {
        // The client is still there: finish its jobs and send the results.
        session.drain().await;
    } else {
        session.close().await;
    }
    if let Err(e) = writer.await {
        tracing::error!(session = %id, error = %e, "connection writer failed");
    }

    state.registry.unregister(&id);
    tracing::info!(session = %id, live = state.registry.len(), "client disconnected");
}
