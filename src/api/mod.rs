pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{ChannelIdentity, Dialog};

pub use http::HttpApi;
pub use memory::MemoryApi;

/// Whether a history entry is something a person wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Message,
    /// Joins, pins, title changes and other system entries.
    Service,
}

/// Reference to the author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum PeerRef {
    User(i64),
    Channel(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReaction {
    /// Absent for custom (non-standard) reactions.
    #[serde(default)]
    pub emoticon: Option<String>,
    pub count: u32,
}

/// A history entry as delivered by the messaging API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reactions: Option<Vec<RawReaction>>,
    /// Excerpt of the replied-to message, when the reply quotes one.
    #[serde(default)]
    pub quote_text: Option<String>,
    #[serde(default)]
    pub from: Option<PeerRef>,
}

impl RawMessage {
    pub fn new(id: i64, date: DateTime<Utc>) -> Self {
        Self {
            id,
            date,
            kind: MessageKind::Message,
            text: None,
            reactions: None,
            quote_text: None,
            from: None,
        }
    }

    pub fn is_service(&self) -> bool {
        self.kind == MessageKind::Service
    }
}

/// Sender entity as the API describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SenderRecord {
    User {
        #[serde(default)]
        first_name: Option<String>,
        #[serde(default)]
        last_name: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
    Channel {
        title: String,
        #[serde(default)]
        username: Option<String>,
    },
    ChannelForbidden { title: String, id: i64 },
    /// Any peer type this client does not know how to describe.
    #[serde(other)]
    Unsupported,
}

/// History query. Results are always ascending by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: Option<usize>,
    /// Only entries with an id greater than this; 0 starts at the beginning.
    pub offset_id: i64,
    /// Restrict to replies to this post.
    pub reply_to: Option<i64>,
}

impl MessageQuery {
    pub fn history(offset_id: i64, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset_id,
            reply_to: None,
        }
    }

    pub fn replies(post_id: i64) -> Self {
        Self {
            limit: None,
            offset_id: 0,
            reply_to: Some(post_id),
        }
    }
}

/// The messaging service. Session and credentials live behind this trait.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    fn list_dialogs(&self) -> BoxStream<'_, Result<Dialog>>;

    fn iter_messages<'a>(
        &'a self,
        channel: &'a ChannelIdentity,
        query: MessageQuery,
    ) -> BoxStream<'a, Result<RawMessage>>;

    /// `Ok(None)` when the message has no resolvable author.
    async fn get_sender(&self, message: &RawMessage) -> Result<Option<SenderRecord>>;
}
