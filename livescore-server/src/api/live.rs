use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use livescore_core::processors::{LiveSession, ResultProvider};
use livescore_sdk::objects::{LiveCloseCode, LiveMessage};
use std::sync::Arc;
use time::Date;
use tokio::sync::mpsc;

use super::{ApiError, DateQuery};
use crate::state::AppState;

/// Messages buffered between the session loop and the socket writer.
const OUTBOUND_BUFFER: usize = 16;

/// `GET /live-stream?date=YYYY-MM-DD` — WebSocket live update stream.
///
/// Upgrades the HTTP connection to a WebSocket and pushes [`LiveMessage`]
/// JSON frames: one `init`, then an `update` or `ping` per refresh tick.
/// A bad date is reported with a [`LiveCloseCode::BAD_DATE`] close frame
/// after the upgrade, so browser clients can see the reason.
pub(super) async fn live_stream(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let date = query.parse();
    ws.on_upgrade(move |socket| handle_live_ws(socket, state, date))
}

/// Background task that drives a single WebSocket connection.
///
/// The [`LiveSession`] runs in its own task and hands messages over a
/// channel; this task relays them to the socket and watches for the client
/// going away. Client data frames are ignored.
async fn handle_live_ws(mut socket: WebSocket, state: AppState, date: Result<Date, ApiError>) {
    let date = match date {
        Ok(date) => date,
        Err(ApiError::BadDate(reason)) => {
            close(&mut socket, LiveCloseCode::BAD_DATE, &reason).await;
            return;
        }
        Err(e) => {
            tracing::error!(error = ?e, "WS: unexpected request error");
            close(&mut socket, LiveCloseCode::INTERNAL_ERROR, "internal error").await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
    let provider: Arc<dyn ResultProvider> = state.aggregator.clone();
    let session = LiveSession::new(provider, date);
    let session_task = tokio::spawn(session.run(tx, state.shutdown_rx.clone()));

    // --- Relay until the session ends or the client disconnects -----------
    let client_gone = loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if send_json(&mut socket, &msg).await.is_err() {
                            break true;
                        }
                    }
                    None => break false,
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break true,
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    if client_gone {
        tracing::debug!(%date, "WS: client disconnected");
        session_task.abort();
        return;
    }

    // --- The session ended on its own --------------------------------------
    let (code, reason) = match session_task.await {
        Ok(Ok(())) => (LiveCloseCode::NORMAL, "server shutting down"),
        Ok(Err(e)) => {
            tracing::error!(error = %e, %date, "WS: initial aggregation failed");
            (LiveCloseCode::INTERNAL_ERROR, "aggregation failed")
        }
        Err(e) => {
            tracing::error!(error = %e, %date, "WS: live session task failed");
            (LiveCloseCode::INTERNAL_ERROR, "internal error")
        }
    };
    close(&mut socket, code, reason).await;
}

async fn close(socket: &mut WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_owned().into(),
        })))
        .await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json(socket: &mut WebSocket, value: &LiveMessage) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
