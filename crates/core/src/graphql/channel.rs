// crates/core/src/graphql/channel.rs
//! `graphql-transport-ws` client for the `jobUpdates` subscription.
//!
//! Handshake: `connection_init` (effective headers as params) → wait for
//! `connection_ack` → `subscribe`. After that a spawned pump task owns the
//! socket and feeds the [`JobSubscription`] in arrival order until the server
//! completes, errors, or closes, or until the subscription is disposed.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{join_errors, GraphqlError, GraphqlResponse, JobUpdatesData, JOB_UPDATES_SUBSCRIPTION};
use crate::error::BridgeError;
use crate::headers::HeaderSet;
use crate::subscription::{ChannelItem, JobSubscription};
use crate::types::{JobHandle, JobUpdate};

/// Websocket subprotocol spoken by the backend.
pub const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

/// Updates queued between the socket and the bridge.
const CHANNEL_BUFFER: usize = 32;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Frames of the `graphql-transport-ws` protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Subscribe {
        id: String,
        payload: SubscribePayload,
    },
    Next {
        id: String,
        payload: Value,
    },
    Error {
        id: String,
        payload: Value,
    },
    Complete {
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

/// Opens one subscription per call against a fixed channel URL.
pub struct SubscriptionClient {
    url: String,
}

impl SubscriptionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn open(
        &self,
        job: &JobHandle,
        headers: &HeaderSet,
    ) -> Result<JobSubscription, BridgeError> {
        let mut request = self.url.as_str().into_client_request().map_err(|e| {
            BridgeError::subscription(format!("invalid channel url {}: {e}", self.url))
        })?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(GRAPHQL_TRANSPORT_WS),
        );

        let (mut socket, _) = connect_async(request)
            .await
            .map_err(|e| BridgeError::subscription(format!("channel connect failed: {e}")))?;

        send(
            &mut socket,
            &WsMessage::ConnectionInit {
                payload: Some(headers.to_json()),
            },
        )
        .await?;
        await_ack(&mut socket).await?;

        let subscription_id = uuid::Uuid::new_v4().to_string();
        send(
            &mut socket,
            &WsMessage::Subscribe {
                id: subscription_id.clone(),
                payload: SubscribePayload {
                    query: JOB_UPDATES_SUBSCRIPTION.to_string(),
                    variables: json!({ "id": job.id }),
                    operation_name: Some("JobUpdates".to_string()),
                },
            },
        )
        .await?;
        tracing::debug!(job_id = %job.id, %subscription_id, url = %self.url, "subscribed");

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(pump(socket, subscription_id, job.id.clone(), tx, close_rx));
        Ok(JobSubscription::new(rx, close_tx))
    }
}

async fn send(socket: &mut Socket, message: &WsMessage) -> Result<(), BridgeError> {
    let text = serde_json::to_string(message)
        .map_err(|e| BridgeError::subscription(format!("encode failed: {e}")))?;
    socket
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| BridgeError::subscription(format!("channel send failed: {e}")))
}

async fn await_ack(socket: &mut Socket) -> Result<(), BridgeError> {
    while let Some(frame) = socket.next().await {
        let frame =
            frame.map_err(|e| BridgeError::subscription(format!("channel error: {e}")))?;
        match frame {
            Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::ConnectionAck { .. }) => return Ok(()),
                Ok(WsMessage::Ping { payload }) => send(socket, &WsMessage::Pong { payload }).await?,
                Ok(other) => tracing::debug!(?other, "frame before connection_ack ignored"),
                Err(e) => tracing::debug!(error = %e, "unparseable frame before connection_ack"),
            },
            Message::Close(frame) => {
                return Err(BridgeError::subscription(format!(
                    "channel closed during handshake ({})",
                    describe_close(frame.as_ref())
                )))
            }
            _ => {}
        }
    }
    Err(BridgeError::subscription("channel closed during handshake"))
}

/// What one inbound text frame means for the subscription.
#[derive(Debug, PartialEq)]
enum Inbound {
    Update(JobUpdate),
    Failed(BridgeError),
    Completed,
    Ping(Option<Value>),
    Ignore,
}

fn decode(text: &str, subscription_id: &str) -> Inbound {
    match serde_json::from_str::<WsMessage>(text) {
        Ok(WsMessage::Next { id, payload }) if id == subscription_id => decode_next(payload),
        Ok(WsMessage::Error { id, payload }) if id == subscription_id => {
            Inbound::Failed(BridgeError::subscription(describe_errors(&payload)))
        }
        Ok(WsMessage::Complete { id }) if id == subscription_id => Inbound::Completed,
        Ok(WsMessage::Ping { payload }) => Inbound::Ping(payload),
        Ok(_) => Inbound::Ignore,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable channel frame");
            Inbound::Ignore
        }
    }
}

fn decode_next(payload: Value) -> Inbound {
    let response: GraphqlResponse<JobUpdatesData> = match serde_json::from_value(payload) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "malformed jobUpdates payload skipped");
            return Inbound::Ignore;
        }
    };
    let errors = response.error_message();
    match response.data.and_then(|d| d.job_updates) {
        Some(update) => Inbound::Update(update),
        None => match errors {
            Some(message) => Inbound::Failed(BridgeError::subscription(message)),
            None => Inbound::Ignore,
        },
    }
}

fn describe_errors(payload: &Value) -> String {
    match serde_json::from_value::<Vec<GraphqlError>>(payload.clone()) {
        Ok(errors) if !errors.is_empty() => join_errors(&errors),
        _ => payload.to_string(),
    }
}

fn describe_close(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) => format!("code {}: {}", u16::from(frame.code), frame.reason.as_str()),
        None => "no close frame".to_string(),
    }
}

async fn pump(
    mut socket: Socket,
    subscription_id: String,
    job_id: String,
    tx: mpsc::Sender<ChannelItem>,
    mut close: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut close => {
                let _ = send(&mut socket, &WsMessage::Complete { id: subscription_id.clone() }).await;
                tracing::debug!(%job_id, "subscription disposed");
                break;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode(&text, &subscription_id) {
                    Inbound::Update(update) => {
                        // a full buffer parks here, so dispose shows up as a closed receiver
                        if tx.send(Ok(update)).await.is_err() {
                            let _ = send(&mut socket, &WsMessage::Complete { id: subscription_id.clone() }).await;
                            tracing::debug!(%job_id, "subscription dropped by consumer");
                            break;
                        }
                    }
                    Inbound::Failed(err) => {
                        tracing::warn!(%job_id, error = %err, "subscription error");
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                    Inbound::Completed => {
                        tracing::debug!(%job_id, "subscription completed by server");
                        break;
                    }
                    Inbound::Ping(payload) => {
                        if let Err(e) = send(&mut socket, &WsMessage::Pong { payload }).await {
                            let _ = tx.send(Err(e)).await;
                            break;
                        }
                    }
                    Inbound::Ignore => {}
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(%job_id, reason = %describe_close(frame.as_ref()), "channel closed by server");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = tx
                        .send(Err(BridgeError::subscription(format!("channel error: {e}"))))
                        .await;
                    return;
                }
                None => return,
            },
        }
    }
    let _ = socket.close(None).await;
}
