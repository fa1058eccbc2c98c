pub mod sqlite;

use crate::app::Result;

pub use sqlite::SqliteStore;

/// Ledger of posts whose documents have been fully written.
pub trait Store {
    fn record_post(&self, channel_id: &str, post_id: i64, comment_count: usize) -> Result<()>;
    fn last_archived_id(&self, channel_id: &str) -> Result<Option<i64>>;
    fn archived_count(&self, channel_id: &str) -> Result<i64>;
}
