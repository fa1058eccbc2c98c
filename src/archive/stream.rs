use futures::stream::{BoxStream, StreamExt};

use crate::api::{MessageQuery, MessagingApi, RawMessage};
use crate::app::Result;
use crate::domain::ChannelIdentity;

/// Ascending, bounded walk over a channel's posts.
///
/// Opening a new stream with a later `start_after` and the remaining
/// budget continues exactly where an earlier one would have.
pub struct MessageStream<'a> {
    inner: Option<BoxStream<'a, Result<RawMessage>>>,
    start_after: i64,
    max_count: usize,
    pulled: usize,
    skipped: usize,
    last_seen_id: Option<i64>,
}

impl<'a> MessageStream<'a> {
    pub fn open(
        api: &'a dyn MessagingApi,
        channel: &'a ChannelIdentity,
        start_after: i64,
        max_count: usize,
    ) -> Self {
        let inner = (max_count > 0)
            .then(|| api.iter_messages(channel, MessageQuery::history(start_after, max_count)));

        Self {
            inner,
            start_after,
            max_count,
            pulled: 0,
            skipped: 0,
            last_seen_id: None,
        }
    }

    /// Next genuine post. Service entries count against the budget but are
    /// never returned.
    pub async fn next_post(&mut self) -> Result<Option<RawMessage>> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };

        while self.pulled < self.max_count {
            let message = match inner.next().await {
                Some(message) => message?,
                None => return Ok(None),
            };
            self.pulled += 1;
            self.last_seen_id = Some(message.id);

            if message.id <= self.start_after {
                continue;
            }
            if message.is_service() {
                tracing::debug!("Skipping service entry {}", message.id);
                self.skipped += 1;
                continue;
            }
            return Ok(Some(message));
        }

        Ok(None)
    }

    /// History entries consumed so far, including skipped ones.
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn last_seen_id(&self) -> Option<i64> {
        self.last_seen_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryApi, MessageKind};
    use crate::domain::Dialog;
    use chrono::{TimeZone, Utc};

    fn channel() -> ChannelIdentity {
        ChannelIdentity::from_dialog(&Dialog {
            name: "News".into(),
            id: -1001,
        })
    }

    fn message(id: i64) -> RawMessage {
        RawMessage::new(id, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn service(id: i64) -> RawMessage {
        RawMessage {
            kind: MessageKind::Service,
            ..message(id)
        }
    }

    async fn collect(stream: &mut MessageStream<'_>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(post) = stream.next_post().await.unwrap() {
            ids.push(post.id);
        }
        ids
    }

    fn api() -> MemoryApi {
        (1..=6).fold(MemoryApi::new(), |api, id| {
            api.with_message(if id == 3 { service(id) } else { message(id) })
        })
    }

    #[tokio::test]
    async fn test_skips_service_entries() {
        let api = api();
        let channel = channel();
        let mut stream = MessageStream::open(&api, &channel, 0, 100);
        assert_eq!(collect(&mut stream).await, vec![1, 2, 4, 5, 6]);
        assert_eq!(stream.skipped(), 1);
        assert_eq!(stream.pulled(), 6);
    }

    #[tokio::test]
    async fn test_never_yields_at_or_before_start() {
        let api = api();
        let channel = channel();
        for start in 0..=6 {
            let mut stream = MessageStream::open(&api, &channel, start, 100);
            let ids = collect(&mut stream).await;
            assert!(ids.iter().all(|id| *id > start), "start {}: {:?}", start, ids);
        }
    }

    #[tokio::test]
    async fn test_bounded_by_max_count() {
        let api = api();
        let channel = channel();
        // Budget of 3 covers 1, 2 and the service entry 3
        let mut stream = MessageStream::open(&api, &channel, 0, 3);
        assert_eq!(collect(&mut stream).await, vec![1, 2]);

        let mut empty = MessageStream::open(&api, &channel, 0, 0);
        assert_eq!(collect(&mut empty).await, Vec::<i64>::new());
    }

    #[tokio::test]
    async fn test_resume_continues_same_sequence() {
        let api = api();
        let channel = channel();

        let mut full = MessageStream::open(&api, &channel, 0, 5);
        let all = collect(&mut full).await;

        let mut first = MessageStream::open(&api, &channel, 0, 5);
        let head = first.next_post().await.unwrap().unwrap();
        let second = first.next_post().await.unwrap().unwrap();
        let remaining = 5 - first.pulled();

        let mut resumed = MessageStream::open(&api, &channel, second.id, remaining);
        let mut stitched = vec![head.id, second.id];
        stitched.extend(collect(&mut resumed).await);

        assert_eq!(stitched, all);
    }

    #[tokio::test]
    async fn test_transient_errors_surface() {
        let api = api().fail_history_at(4, 1);
        let channel = channel();
        let mut stream = MessageStream::open(&api, &channel, 0, 100);
        assert_eq!(stream.next_post().await.unwrap().unwrap().id, 1);
        assert_eq!(stream.next_post().await.unwrap().unwrap().id, 2);
        let err = stream.next_post().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(stream.last_seen_id(), Some(3));
    }
}
