// Chat notification feed over WebSocket

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::FeedError;

/// `type` of the event pushed when someone starts a chat with the user
pub const CHAT_CREATED: &str = "chat_created";

/// Event pushed by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    ChatCreated(ChatCreated),
    Other { kind: String, payload: Value },
}

/// `chat_created` payload, kept whole
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCreated {
    pub payload: Map<String, Value>,
}

impl ChatCreated {
    pub fn chat_id(&self) -> Option<i64> {
        self.payload.get("chatId").and_then(Value::as_i64)
    }
}

/// Decode one text frame
pub fn parse_event(text: &str) -> Result<FeedEvent, FeedError> {
    let value: Value = serde_json::from_str(text)?;

    let event = match value {
        Value::Object(map) => {
            let kind = map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            if kind == CHAT_CREATED {
                FeedEvent::ChatCreated(ChatCreated { payload: map })
            } else {
                FeedEvent::Other {
                    kind,
                    payload: Value::Object(map),
                }
            }
        }
        other => FeedEvent::Other {
            kind: String::new(),
            payload: other,
        },
    };

    Ok(event)
}

/// Live connection to the notification feed
pub struct NotificationFeed {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl NotificationFeed {
    /// Connect and identify as `user_id`
    pub async fn connect(url: &Url, user_id: i64) -> Result<Self, FeedError> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::InvalidUrl(url.to_string()));
        }

        tracing::info!(url = %url, user_id = user_id, "Connecting to notification feed");
        let (mut stream, _) = connect_async(url.as_str()).await?;

        let hello = json!({ "userId": user_id }).to_string();
        stream.send(Message::text(hello)).await?;

        tracing::debug!("Notification feed connected");
        Ok(Self { stream })
    }

    /// Next event, or `None` once the server closes the feed.
    /// A frame that fails to decode is reported without ending the feed.
    pub async fn next_event(&mut self) -> Option<Result<FeedEvent, FeedError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(parse_event(text.as_str())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Notification feed closed by server");
                    return None;
                }
                // Pings are answered by tungstenite; binary frames are not part of the feed
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(e) => {
                    tracing::warn!(error = %e, "Notification feed error");
                    return Some(Err(e.into()));
                }
            }
        }

        None
    }

    pub async fn close(mut self) -> Result<(), FeedError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
