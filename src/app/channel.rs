//! QR confirmation channel
//!
//! The portal pushes QR login progress over a WebSocket keyed by the challenge
//! uuid. After one `UPDATE_QR_CODE` request the server sends a stream of
//! `UPDATE_QR_CODE` events (new signature and timestamp for the displayed code)
//! and finally a `LOGIN` event once the user confirms on their phone.
//!
//! Refreshed payloads are forwarded to the caller through an mpsc sender; the
//! wait itself ends on `LOGIN`, on disconnect, or when the cancellation token fires.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::client::AuthTarget;
use crate::constants::{channel, portal};
use crate::errors::{ChannelError, ChannelResult};

/// Data needed to draw the current QR code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub uuid: String,
    pub sig: String,
    pub ts: String,
}

impl QrPayload {
    /// URI encoded into the QR code
    pub fn confirm_uri(&self) -> String {
        format!(
            "{}{}?uuid={}&ts={}&sig={}",
            portal::BASE_URL,
            portal::CONFIRM_SCAN_PATH,
            self.uuid,
            self.ts,
            self.sig
        )
    }
}

/// Events the channel cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The displayed code rotated
    Refresh(QrPayload),
    /// The user confirmed the login
    Confirmed,
}

/// Something that can wait for a QR login confirmation
#[async_trait]
pub trait ChallengeChannel: Send + Sync {
    /// Block until the login is confirmed
    ///
    /// Refreshed codes are sent on `refresh` as they arrive. Returns
    /// `ChannelError::Closed` if the channel ends first and
    /// `ChannelError::Cancelled` once `cancel` fires.
    async fn await_confirmation(
        &self,
        target: &AuthTarget,
        refresh: mpsc::UnboundedSender<QrPayload>,
        cancel: CancellationToken,
    ) -> ChannelResult<()>;
}

/// WebSocket implementation against the portal's push endpoint
#[derive(Debug, Clone)]
pub struct WebSocketChannel {
    endpoint: String,
}

impl WebSocketChannel {
    /// Channel against the default portal endpoint
    pub fn new() -> Self {
        Self::with_endpoint(portal::CHANNEL_URL)
    }

    /// Channel against a custom endpoint prefix; the uuid is appended as a path segment
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, target: &AuthTarget) -> String {
        format!("{}/{}", self.endpoint, target.uuid())
    }
}

impl Default for WebSocketChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeChannel for WebSocketChannel {
    async fn await_confirmation(
        &self,
        target: &AuthTarget,
        refresh: mpsc::UnboundedSender<QrPayload>,
        cancel: CancellationToken,
    ) -> ChannelResult<()> {
        let url = self.url_for(target);
        info!("Opening QR confirmation channel");
        debug!("Channel URL: {}", url);

        let (mut socket, _) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChannelError::Cancelled),
            connected = connect_async(url.as_str()) => connected.map_err(map_ws_error)?,
        };

        let request = serde_json::json!({ "type": channel::UPDATE_QR_CODE }).to_string();
        socket.send(Message::Text(request)).await.map_err(map_ws_error)?;

        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = socket.close(None).await;
                    return Err(ChannelError::Cancelled);
                }
                message = socket.next() => message,
            };

            let text = match message {
                None => return Err(ChannelError::Closed),
                Some(Err(e)) => return Err(map_ws_error(e)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Channel closed by server: {:?}", frame);
                    return Err(ChannelError::Closed);
                }
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(_)) => continue,
            };

            match parse_event(&text, target.uuid())? {
                Some(ChannelEvent::Refresh(payload)) => {
                    debug!("QR code refreshed (ts {})", payload.ts);
                    if refresh.send(payload).is_err() {
                        warn!("QR refresh receiver dropped");
                    }
                }
                Some(ChannelEvent::Confirmed) => {
                    info!("QR login confirmed");
                    let _ = socket.close(None).await;
                    return Ok(());
                }
                None => {}
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<RawPayload>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    sig: serde_json::Value,
    ts: serde_json::Value,
}

/// Decode one text frame; unknown event types yield `None`
pub fn parse_event(text: &str, uuid: &str) -> ChannelResult<Option<ChannelEvent>> {
    let raw: RawEvent = serde_json::from_str(text).map_err(|e| ChannelError::Protocol {
        reason: format!("undecodable event: {}", e),
    })?;

    match raw.kind.as_str() {
        channel::UPDATE_QR_CODE => {
            let payload = raw.payload.ok_or_else(|| ChannelError::Protocol {
                reason: "QR refresh without payload".to_string(),
            })?;
            Ok(Some(ChannelEvent::Refresh(QrPayload {
                uuid: uuid.to_string(),
                sig: json_scalar(&payload.sig),
                ts: json_scalar(&payload.ts),
            })))
        }
        channel::LOGIN => Ok(Some(ChannelEvent::Confirmed)),
        other => {
            debug!("Ignoring channel event {}", other);
            Ok(None)
        }
    }
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_ws_error(error: WsError) -> ChannelError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_) => {
            ChannelError::Closed
        }
        other => ChannelError::Transport(other),
    }
}
