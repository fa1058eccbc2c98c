use std::sync::Arc;

use crate::api::{MessagingApi, RawMessage, SenderRecord};
use crate::app::Result;
use crate::domain::SenderIdentity;

/// Resolves comment authors into [`SenderIdentity`] values.
pub struct SenderResolver {
    api: Arc<dyn MessagingApi>,
}

impl SenderResolver {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }

    /// Only API failures are returned as errors; every sender shape,
    /// including none at all, maps to a variant.
    pub async fn resolve(&self, message: &RawMessage) -> Result<SenderIdentity> {
        let record = self.api.get_sender(message).await?;
        Ok(identity_from_record(record))
    }
}

pub fn identity_from_record(record: Option<SenderRecord>) -> SenderIdentity {
    match record {
        Some(SenderRecord::Channel { title, username }) => SenderIdentity::ChannelActor {
            title,
            handle: username,
        },
        Some(SenderRecord::ChannelForbidden { title, id }) => {
            SenderIdentity::ForbiddenChannel { title, id }
        }
        Some(SenderRecord::User {
            first_name,
            last_name,
            username,
        }) => SenderIdentity::NamedUser {
            display_name: display_name(first_name.as_deref(), last_name.as_deref()),
            handle: username,
        },
        Some(SenderRecord::Unsupported) | None => SenderIdentity::Unknown,
    }
}

fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
