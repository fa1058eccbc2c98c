use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Channel not found among dialogs: {0}")]
    ChannelNotFound(String),

    #[error("Transient fetch error{}: {reason}", post_suffix(.post_id))]
    TransientFetch {
        post_id: Option<i64>,
        reason: String,
    },

    #[error("No message {0} to reply to")]
    ReplyTargetMissing(i64),

    #[error("Failed to write document for post {post_id}: {source}")]
    Write {
        post_id: i64,
        source: std::io::Error,
    },

    #[error("Gave up on post {post_id} after {attempts} attempts")]
    RetriesExhausted { post_id: i64, attempts: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("{0}")]
    Other(String),
}

fn post_suffix(post_id: &Option<i64>) -> String {
    match post_id {
        Some(id) => format!(" on post {}", id),
        None => String::new(),
    }
}

impl ArchiveError {
    /// Whether the driver may back off and retry the current post.
    pub fn is_transient(&self) -> bool {
        match self {
            ArchiveError::TransientFetch { .. } => true,
            ArchiveError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
                    })
            }
            _ => false,
        }
    }

    /// Attach the post being processed to a transient error that lacks one.
    pub fn at_post(self, id: i64) -> Self {
        match self {
            ArchiveError::TransientFetch {
                post_id: None,
                reason,
            } => ArchiveError::TransientFetch {
                post_id: Some(id),
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
