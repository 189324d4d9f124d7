//! WebSocket handler for real-time build updates.
//!
//! Every connected client receives a `buildUpdate` message for each build
//! event. A client can narrow the stream by sending
//! `{"action":"subscribe","buildJobId":"..."}` and widen it again with
//! `{"action":"subscribeAll"}`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BuildEvent, BuildUpdateMessage, ClientCommand};
use crate::services::{BuildService, ConnectionRegistry};

/// Ping interval for keeping connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for receiving pong response.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Which builds a connection wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubscriptionFilter {
    #[default]
    All,
    Only(HashSet<Uuid>),
}

impl SubscriptionFilter {
    pub fn matches(&self, build_job_id: Uuid) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&build_job_id),
        }
    }

    pub fn apply(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Subscribe { build_job_id } => match self {
                Self::All => *self = Self::Only(HashSet::from([build_job_id])),
                Self::Only(ids) => {
                    ids.insert(build_job_id);
                }
            },
            ClientCommand::Unsubscribe { build_job_id } => {
                // Unsubscribing while receiving everything keeps everything.
                if let Self::Only(ids) = self {
                    ids.remove(&build_job_id);
                }
            }
            ClientCommand::SubscribeAll => *self = Self::All,
        }
    }
}

/// WebSocket handler - upgrades the HTTP connection and starts streaming events.
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    service: web::Data<BuildService>,
    connections: web::Data<ConnectionRegistry>,
) -> Result<HttpResponse, actix_web::Error> {
    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    // Subscribe before returning the upgrade so no event after the handshake is missed.
    let rx = service.store().broadcaster().subscribe();
    let guard = connections.register(client_addr.clone());

    info!(
        client = %client_addr,
        connection_id = %guard.id(),
        open = connections.len(),
        subscribers = service.store().broadcaster().receiver_count(),
        "WebSocket connection established"
    );

    actix_web::rt::spawn(async move {
        handle_websocket_connection(session, msg_stream, rx, &client_addr).await;
        drop(guard);
    });

    Ok(response)
}

/// Handles an individual WebSocket connection.
async fn handle_websocket_connection(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut rx: tokio::sync::broadcast::Receiver<BuildEvent>,
    client_addr: &str,
) {
    let mut filter = SubscriptionFilter::default();

    let mut last_pong = Instant::now();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            msg_result = msg_stream.next() => {
                let Some(msg_result) = msg_result else {
                    debug!(client = %client_addr, "Client stream ended");
                    break;
                };
                match msg_result {
                    Ok(Message::Ping(bytes)) => {
                        debug!(client = %client_addr, "Received ping");
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Pong(_)) => {
                        debug!(client = %client_addr, "Received pong");
                        last_pong = Instant::now();
                    }
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => {
                                debug!(client = %client_addr, command = ?command, "Subscription change");
                                filter.apply(command);
                            }
                            Err(e) => {
                                debug!(client = %client_addr, error = %e, "Ignoring unrecognized message");
                            }
                        }
                    }
                    Ok(Message::Close(reason)) => {
                        info!(client = %client_addr, reason = ?reason, "Client requested close");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(client = %client_addr, error = %e, "WebSocket message error");
                        break;
                    }
                }
            }

            event_result = rx.recv() => {
                match event_result {
                    Ok(event) => {
                        if !filter.matches(event.job_id()) {
                            continue;
                        }
                        match serde_json::to_string(&BuildUpdateMessage::from(&event)) {
                            Ok(json) => {
                                if session.text(json).await.is_err() {
                                    warn!(client = %client_addr, "Failed to send event, closing connection");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Failed to serialize build update");
                            }
                        }
                    }
                    Err(RecvError::Lagged(count)) => {
                        warn!(client = %client_addr, missed = count, "Client lagged, missed events");
                    }
                    Err(RecvError::Closed) => {
                        info!(client = %client_addr, "Broadcast channel closed");
                        break;
                    }
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                    warn!(client = %client_addr, "Pong timeout, closing connection");
                    break;
                }

                if session.ping(b"").await.is_err() {
                    warn!(client = %client_addr, "Failed to send ping, closing connection");
                    break;
                }
            }
        }
    }

    let _ = session.close(None).await;
    info!(client = %client_addr, "WebSocket connection closed");
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(websocket_handler)));
}
