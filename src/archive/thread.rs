use std::sync::Arc;

use futures::TryStreamExt;

use crate::api::{MessageQuery, MessagingApi, RawMessage};
use crate::app::{ArchiveError, Result};
use crate::domain::ChannelIdentity;

/// Retrieves the replies attached to a post.
pub struct ThreadFetcher {
    api: Arc<dyn MessagingApi>,
}

impl ThreadFetcher {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }

    /// Replies in ascending timestamp order.
    ///
    /// A post that cannot be replied to has no thread, so the result is
    /// empty rather than an error. Any other failure is returned unchanged.
    pub async fn fetch_thread(
        &self,
        channel: &ChannelIdentity,
        post_id: i64,
    ) -> Result<Vec<RawMessage>> {
        let replies: Result<Vec<RawMessage>> = self
            .api
            .iter_messages(channel, MessageQuery::replies(post_id))
            .try_collect()
            .await;

        match replies {
            Ok(mut replies) => {
                replies.sort_by_key(|m| (m.date, m.id));
                Ok(replies)
            }
            Err(ArchiveError::ReplyTargetMissing(_)) => {
                tracing::debug!("Post {} has no thread", post_id);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
