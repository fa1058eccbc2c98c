use futures::TryStreamExt;

use crate::api::MessagingApi;
use crate::app::{ArchiveError, Result};
use crate::domain::ChannelIdentity;

/// Finds the channel to archive among the session's dialogs.
pub struct ChannelResolver<'a> {
    api: &'a dyn MessagingApi,
}

impl<'a> ChannelResolver<'a> {
    pub fn new(api: &'a dyn MessagingApi) -> Self {
        Self { api }
    }

    /// First dialog whose display name matches exactly. Listing stops at the
    /// match; an exhausted listing is fatal.
    pub async fn resolve(&self, target: &str) -> Result<ChannelIdentity> {
        let mut dialogs = self.api.list_dialogs();
        while let Some(dialog) = dialogs.try_next().await? {
            tracing::debug!("- {}: {}", dialog.name, dialog.id);
            if dialog.name == target {
                let identity = ChannelIdentity::from_dialog(&dialog);
                tracing::info!("Resolved channel {} to id {}", target, identity.numeric_id);
                return Ok(identity);
            }
        }
        Err(ArchiveError::ChannelNotFound(target.to_string()))
    }
}
