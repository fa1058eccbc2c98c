//! # chanarchive
//!
//! Archives the full history of a public channel, every post plus its
//! comment thread, as one Markdown document per post.
//!
//! ## Architecture
//!
//! ```text
//! MessagingApi → MessageStream → enrich (thread, senders, reactions) → render → write
//! ```
//!
//! - [`api`]: The messaging service seam and its HTTP bridge client
//! - [`archive`]: Pagination, retry, enrichment, rendering and writing
//! - [`store`]: SQLite ledger of archived posts
//!
//! ## Quick Start
//!
//! ```bash
//! # See which dialogs the session can read
//! chanarchive dialogs
//!
//! # Archive a channel into ./posts
//! chanarchive archive --channel "Rust News"
//!
//! # Pick up where the last run stopped
//! chanarchive archive --resume
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the API
/// client, the ledger and the archive components.
pub mod app;

/// Configuration loaded from `~/.config/chanarchive/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `archive` - Walk the channel and write documents
/// - `dialogs` - List dialogs visible to the session
/// - `status` - Show archive progress
pub mod cli;

/// Core domain models.
///
/// - [`Post`](domain::Post) and [`Comment`](domain::Comment)
/// - [`SenderIdentity`](domain::SenderIdentity): who wrote a comment
/// - [`ReactionTally`](domain::ReactionTally): ordered reaction counts
pub mod domain;

/// Messaging API access.
///
/// - [`MessagingApi`](api::MessagingApi): Async trait for the service
/// - [`HttpApi`](api::HttpApi): reqwest-based bridge client
/// - [`MemoryApi`](api::MemoryApi): In-memory fixture
pub mod api;

/// The archive pipeline, driven by [`ArchiveDriver`](archive::ArchiveDriver).
pub mod archive;

/// SQLite ledger of written posts.
pub mod store;
