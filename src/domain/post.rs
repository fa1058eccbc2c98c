use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReactionTally, SenderIdentity};

/// A reply in a post's thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub sender: SenderIdentity,
    pub timestamp: DateTime<Utc>,
    pub quoted_excerpt: Option<String>,
    pub body: Option<String>,
    pub reactions: ReactionTally,
}

/// A top-level channel message together with its thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub body: Option<String>,
    pub reactions: ReactionTally,
    /// Ascending by timestamp.
    pub comments: Vec<Comment>,
}
