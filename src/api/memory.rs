//! In-memory messaging API for tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::api::{MessageQuery, MessagingApi, PeerRef, RawMessage, SenderRecord};
use crate::app::{ArchiveError, Result};
use crate::domain::{ChannelIdentity, Dialog};

/// Serves a fixed channel history and can inject failures.
///
/// A history failure registered for post `N` makes the stream yield a
/// transient error in place of `N`, once per registered attempt. Every
/// history query is recorded so callers can inspect resume offsets.
#[derive(Default)]
pub struct MemoryApi {
    dialogs: Vec<Dialog>,
    history: Vec<RawMessage>,
    replies: HashMap<i64, Vec<RawMessage>>,
    senders: HashMap<PeerRef, SenderRecord>,
    missing_threads: HashSet<i64>,
    history_failures: Mutex<HashMap<i64, u32>>,
    thread_failures: Mutex<HashMap<i64, u32>>,
    queries: Mutex<Vec<MessageQuery>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialog(mut self, name: &str, id: i64) -> Self {
        self.dialogs.push(Dialog {
            name: name.to_string(),
            id,
        });
        self
    }

    pub fn with_message(mut self, message: RawMessage) -> Self {
        self.history.push(message);
        self.history.sort_by_key(|m| m.id);
        self
    }

    pub fn with_reply(mut self, post_id: i64, reply: RawMessage) -> Self {
        self.replies.entry(post_id).or_default().push(reply);
        self
    }

    pub fn with_sender(mut self, peer: PeerRef, record: SenderRecord) -> Self {
        self.senders.insert(peer, record);
        self
    }

    /// Thread lookups for `post_id` report that the post cannot be replied to.
    pub fn with_missing_thread(mut self, post_id: i64) -> Self {
        self.missing_threads.insert(post_id);
        self
    }

    pub fn fail_history_at(self, post_id: i64, times: u32) -> Self {
        lock(&self.history_failures).insert(post_id, times);
        self
    }

    pub fn fail_thread_at(self, post_id: i64, times: u32) -> Self {
        lock(&self.thread_failures).insert(post_id, times);
        self
    }

    /// Channel history queries seen so far, in call order.
    pub fn history_queries(&self) -> Vec<MessageQuery> {
        lock(&self.queries).clone()
    }

    fn take_failure(counters: &Mutex<HashMap<i64, u32>>, id: i64) -> bool {
        let mut counters = lock(counters);
        match counters.get_mut(&id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn history_page(&self, query: MessageQuery) -> Vec<Result<RawMessage>> {
        lock(&self.queries).push(query);

        let mut out = Vec::new();
        let limit = query.limit.unwrap_or(usize::MAX);
        for message in self
            .history
            .iter()
            .filter(|m| m.id > query.offset_id)
            .take(limit)
        {
            if Self::take_failure(&self.history_failures, message.id) {
                out.push(Err(ArchiveError::TransientFetch {
                    post_id: Some(message.id),
                    reason: "injected failure".to_string(),
                }));
                break;
            }
            out.push(Ok(message.clone()));
        }
        out
    }

    fn thread_page(&self, post_id: i64) -> Vec<Result<RawMessage>> {
        if self.missing_threads.contains(&post_id) {
            return vec![Err(ArchiveError::ReplyTargetMissing(post_id))];
        }
        if Self::take_failure(&self.thread_failures, post_id) {
            return vec![Err(ArchiveError::TransientFetch {
                post_id: None,
                reason: "injected thread failure".to_string(),
            })];
        }

        let mut replies = self.replies.get(&post_id).cloned().unwrap_or_default();
        replies.sort_by_key(|m| m.id);
        replies.into_iter().map(Ok).collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl MessagingApi for MemoryApi {
    fn list_dialogs(&self) -> BoxStream<'_, Result<Dialog>> {
        stream::iter(self.dialogs.clone().into_iter().map(Ok)).boxed()
    }

    fn iter_messages<'a>(
        &'a self,
        _channel: &'a ChannelIdentity,
        query: MessageQuery,
    ) -> BoxStream<'a, Result<RawMessage>> {
        let items = match query.reply_to {
            Some(post_id) => self.thread_page(post_id),
            None => self.history_page(query),
        };
        stream::iter(items).boxed()
    }

    async fn get_sender(&self, message: &RawMessage) -> Result<Option<SenderRecord>> {
        Ok(message.from.and_then(|peer| self.senders.get(&peer).cloned()))
    }
}
