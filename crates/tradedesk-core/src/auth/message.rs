//! Window-to-window messaging.
//!
//! `MessageChannel` models one window's `message` event target. Senders
//! name the origin they expect the receiving window to have; the message
//! is dropped unless it matches, the way `postMessage(data, targetOrigin)`
//! behaves. Receivers see the sender's origin on every event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use super::session::AuthData;

const CHANNEL_CAPACITY: usize = 16;

/// The handshake messages exchanged between the callback page and its opener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AuthMessage {
    #[serde(rename = "AUTH_SUCCESS")]
    Success { data: AuthData },

    #[serde(rename = "AUTH_ERROR")]
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Origin of the window that posted the message.
    pub origin: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct MessageChannel {
    origin: String,
    tx: broadcast::Sender<MessageEvent>,
}

impl MessageChannel {
    /// Create the event target of a window whose page has `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            origin: origin.into(),
            tx,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Register a listener. Dropping the receiver removes it.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.tx.subscribe()
    }

    /// Post `data` to this window on behalf of a page at `source_origin`.
    ///
    /// Returns whether any listener received it. Nothing is delivered when
    /// `target_origin` differs from this window's origin.
    pub fn post_message(&self, data: Value, target_origin: &str, source_origin: &str) -> bool {
        if target_origin != self.origin {
            trace!(target_origin, "Dropping message for a different origin");
            return false;
        }
        let event = MessageEvent {
            origin: source_origin.to_string(),
            data,
        };
        self.tx.send(event).is_ok()
    }
}
