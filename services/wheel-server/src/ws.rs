use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;

use fortune_wheel_common::types::lamports_to_sol;

use crate::coordinator::HISTORY_PAGE;
use crate::msg::WsEvent;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// One connected client: a full snapshot on connect, then the shared event
/// stream until either side goes away.
async fn client_session(socket: WebSocket, state: Arc<AppState>) {
    let mut events = state.events.subscribe();
    let (mut sink, mut stream) = socket.split();

    let init = init_snapshot(&state).await;
    if send_event(&mut sink, &init).await.is_err() {
        return;
    }
    debug!("client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Slow consumer; it catches up from the live stream.
                    debug!(skipped, "client lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound client messages are ignored.
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("client disconnected");
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &WsEvent,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(error) => {
            debug!(%error, "failed to serialize event");
            return Ok(());
        }
    };
    sink.send(Message::Text(payload)).await
}

async fn init_snapshot(state: &Arc<AppState>) -> WsEvent {
    let (history, cumulative_total) = {
        let ledger = state.ledger.lock().await;
        (ledger.recent(HISTORY_PAGE), ledger.cumulative_total())
    };
    let wheel = state.wheel.read().await;
    WsEvent::Init {
        segments: wheel.segments.segments.clone(),
        total_eligible_supply: wheel.segments.total_eligible_supply,
        holder_count: wheel.holder_count,
        last_winner: wheel.last_winner.clone(),
        history,
        countdown_seconds: (wheel.next_spin_at - Utc::now()).num_seconds().max(0),
        spinning: wheel.phase.is_spinning(),
        balance_sol: lamports_to_sol(wheel.operator_balance_lamports),
        cumulative_total_sol: lamports_to_sol(cumulative_total),
    }
}
