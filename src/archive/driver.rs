use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::api::{MessagingApi, RawMessage};
use crate::app::{ArchiveError, Result};
use crate::archive::{
    ChannelResolver, DocumentRenderer, DocumentWriter, MessageStream, ReactionAggregator,
    SenderResolver, ThreadFetcher,
};
use crate::config::ArchiveConfig;
use crate::domain::{ChannelIdentity, Comment, Post};
use crate::store::Store;

/// Pacing, backoff and bounds for a run.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// History entries to walk, service entries included.
    pub limit: usize,
    pub pacing: Duration,
    pub backoff: Duration,
    /// Consecutive transient failures tolerated on one post.
    pub max_retries: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from_config(&ArchiveConfig::default())
    }
}

impl DriverSettings {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            limit: config.limit,
            pacing: config.pacing(),
            backoff: config.backoff(),
            max_retries: config.max_retries,
        }
    }
}

/// Resume point for the history walk. Lives only for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveCursor {
    pub last_attempted_post_id: i64,
}

impl ArchiveCursor {
    pub fn new(start_after: i64) -> Self {
        Self {
            last_attempted_post_id: start_after,
        }
    }

    /// Never moves backwards.
    pub fn advance(&mut self, post_id: i64) {
        self.last_attempted_post_id = self.last_attempted_post_id.max(post_id);
    }

    /// Position just before `post_id`, so the next walk yields it again.
    pub fn rewind_before(&mut self, post_id: i64) {
        self.last_attempted_post_id = post_id - 1;
    }
}

/// Outcome of [`ArchiveDriver::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub written: usize,
    pub skipped: usize,
    pub retries: usize,
    pub last_post_id: Option<i64>,
    pub cancelled: bool,
}

enum State {
    Fetching,
    Retrying { failing_post: i64 },
    Done,
}

/// How a single walk over the stream ended.
enum Walk {
    Exhausted,
    Cancelled,
    Interrupted { failing_post: i64, error: ArchiveError },
}

#[derive(Default)]
struct RetryCounter {
    post_id: Option<i64>,
    attempts: u32,
}

impl RetryCounter {
    fn register(&mut self, post_id: i64) -> u32 {
        if self.post_id == Some(post_id) {
            self.attempts += 1;
        } else {
            self.post_id = Some(post_id);
            self.attempts = 1;
        }
        self.attempts
    }

    fn clear_if(&mut self, post_id: i64) {
        if self.post_id == Some(post_id) {
            *self = Self::default();
        }
    }
}

/// Walks a channel's history and writes one document per post.
///
/// Runs as a single task: each post is fetched, enriched, rendered and
/// written before the next is pulled. A transient failure rewinds the
/// cursor to just before the failing post and re-opens the stream after a
/// backoff; anything else ends the run.
pub struct ArchiveDriver {
    api: Arc<dyn MessagingApi>,
    channel: ChannelIdentity,
    threads: ThreadFetcher,
    senders: SenderResolver,
    reactions: ReactionAggregator,
    renderer: DocumentRenderer,
    writer: DocumentWriter,
    settings: DriverSettings,
    store: Option<Arc<dyn Store + Send + Sync>>,
    running: Arc<AtomicBool>,
}

impl ArchiveDriver {
    pub fn new(
        api: Arc<dyn MessagingApi>,
        channel: ChannelIdentity,
        renderer: DocumentRenderer,
        writer: DocumentWriter,
        settings: DriverSettings,
    ) -> Self {
        Self {
            threads: ThreadFetcher::new(api.clone()),
            senders: SenderResolver::new(api.clone()),
            reactions: ReactionAggregator::default(),
            api,
            channel,
            renderer,
            writer,
            settings,
            store: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Resolve `channel_name` among the session's dialogs, then build a driver.
    pub async fn connect(
        api: Arc<dyn MessagingApi>,
        channel_name: &str,
        renderer: DocumentRenderer,
        writer: DocumentWriter,
        settings: DriverSettings,
    ) -> Result<Self> {
        let channel = ChannelResolver::new(api.as_ref()).resolve(channel_name).await?;
        Ok(Self::new(api, channel, renderer, writer, settings))
    }

    pub fn with_reactions(mut self, reactions: ReactionAggregator) -> Self {
        self.reactions = reactions;
        self
    }

    /// Record each written post in `store`.
    pub fn with_store(mut self, store: Arc<dyn Store + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    /// Flag polled between posts; clearing it stops the run after the
    /// current document is written.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn channel(&self) -> &ChannelIdentity {
        &self.channel
    }

    pub async fn run(&self, start_after: i64) -> Result<ArchiveSummary> {
        self.writer.ensure_dir().await?;

        let mut cursor = ArchiveCursor::new(start_after);
        let mut budget = self.settings.limit;
        let mut retry = RetryCounter::default();
        let mut summary = ArchiveSummary::default();
        let mut state = State::Fetching;

        loop {
            state = match state {
                State::Fetching => {
                    match self
                        .walk(&mut cursor, &mut budget, &mut retry, &mut summary)
                        .await?
                    {
                        Walk::Exhausted => State::Done,
                        Walk::Cancelled => {
                            summary.cancelled = true;
                            State::Done
                        }
                        Walk::Interrupted {
                            failing_post,
                            error,
                        } => {
                            warn!(
                                "Error on post {}, retrying from {} after {:?}: {}",
                                failing_post, cursor.last_attempted_post_id, self.settings.backoff, error
                            );
                            State::Retrying { failing_post }
                        }
                    }
                }
                State::Retrying { failing_post } => {
                    let attempts = retry.register(failing_post);
                    if attempts > self.settings.max_retries {
                        error!("Giving up on post {} after {} attempts", failing_post, attempts);
                        return Err(ArchiveError::RetriesExhausted {
                            post_id: failing_post,
                            attempts,
                        });
                    }
                    summary.retries += 1;
                    tokio::time::sleep(self.settings.backoff).await;
                    State::Fetching
                }
                State::Done => break,
            };
        }

        info!(
            "Archive finished: {} written, {} skipped, {} retries",
            summary.written, summary.skipped, summary.retries
        );
        Ok(summary)
    }

    /// One pass over a freshly opened stream, starting after the cursor.
    async fn walk(
        &self,
        cursor: &mut ArchiveCursor,
        budget: &mut usize,
        retry: &mut RetryCounter,
        summary: &mut ArchiveSummary,
    ) -> Result<Walk> {
        let mut stream = MessageStream::open(
            self.api.as_ref(),
            &self.channel,
            cursor.last_attempted_post_id,
            *budget,
        );

        let outcome = loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("Stopping before post after {}", cursor.last_attempted_post_id);
                break Walk::Cancelled;
            }

            let raw = match stream.next_post().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break Walk::Exhausted,
                Err(e) if e.is_transient() => {
                    // The failing entry was never consumed
                    let failing_post = match &e {
                        ArchiveError::TransientFetch {
                            post_id: Some(id), ..
                        } => {
                            cursor.rewind_before(*id);
                            *id
                        }
                        _ => {
                            if let Some(seen) = stream.last_seen_id() {
                                cursor.advance(seen);
                            }
                            cursor.last_attempted_post_id + 1
                        }
                    };
                    *budget -= stream.pulled();
                    summary.skipped += stream.skipped();
                    return Ok(Walk::Interrupted {
                        failing_post,
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            };

            cursor.advance(raw.id);
            info!("Processing {}", raw.id);

            match self.archive_post(&raw).await {
                Ok(()) => {
                    summary.written += 1;
                    summary.last_post_id = Some(raw.id);
                    retry.clear_if(raw.id);
                    tokio::time::sleep(self.settings.pacing).await;
                }
                Err(e) if e.is_transient() => {
                    cursor.rewind_before(raw.id);
                    // `raw` will be pulled again by the next stream
                    *budget -= stream.pulled() - 1;
                    summary.skipped += stream.skipped();
                    return Ok(Walk::Interrupted {
                        failing_post: raw.id,
                        error: e,
                    });
                }
                Err(e) => {
                    error!("Failed to archive post {}: {}", raw.id, e);
                    return Err(e);
                }
            }
        };

        *budget -= stream.pulled();
        summary.skipped += stream.skipped();
        Ok(outcome)
    }

    async fn archive_post(&self, raw: &RawMessage) -> Result<()> {
        let post = self.enrich(raw).await.map_err(|e| e.at_post(raw.id))?;
        let document = self.renderer.render(&post, &self.channel);
        self.writer.write(post.id, &document).await?;

        if let Some(store) = &self.store {
            store.record_post(&self.channel.numeric_id, post.id, post.comments.len())?;
        }
        Ok(())
    }

    async fn enrich(&self, raw: &RawMessage) -> Result<Post> {
        let replies = self.threads.fetch_thread(&self.channel, raw.id).await?;

        let mut comments = Vec::with_capacity(replies.len());
        for reply in replies {
            let sender = self.senders.resolve(&reply).await?;
            comments.push(Comment {
                id: reply.id,
                sender,
                timestamp: reply.date,
                reactions: self.reactions.aggregate(reply.reactions.as_deref()),
                quoted_excerpt: reply.quote_text,
                body: reply.text,
            });
        }

        Ok(Post {
            id: raw.id,
            timestamp: raw.date,
            body: raw.text.clone(),
            reactions: self.reactions.aggregate(raw.reactions.as_deref()),
            comments,
        })
    }
}
