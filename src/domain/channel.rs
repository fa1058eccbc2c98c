use serde::{Deserialize, Serialize};

/// Prefix the messaging API puts in front of channel-scope dialog ids.
const CHANNEL_ID_PREFIX: &str = "-100";

/// A conversation visible to the session, as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub name: String,
    pub id: i64,
}

/// The channel being archived. Resolved once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelIdentity {
    pub name: String,
    /// Dialog id with the channel-scope prefix stripped; used in public URLs.
    pub numeric_id: String,
    /// Id as reported by the dialog listing; used to address the API.
    pub dialog_id: i64,
}

impl ChannelIdentity {
    pub fn from_dialog(dialog: &Dialog) -> Self {
        let raw = dialog.id.to_string();
        let numeric_id = raw
            .strip_prefix(CHANNEL_ID_PREFIX)
            .unwrap_or(&raw)
            .to_string();

        Self {
            name: dialog.name.clone(),
            numeric_id,
            dialog_id: dialog.id,
        }
    }

    /// Canonical link to a post, e.g. `https://t.me/c/1234/42`.
    pub fn post_url(&self, link_base: &str, post_id: i64) -> String {
        format!(
            "{}/c/{}/{}",
            link_base.trim_end_matches('/'),
            self.numeric_id,
            post_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_channel_prefix() {
        let dialog = Dialog {
            name: "Rust News".into(),
            id: -1001234567890,
        };
        let identity = ChannelIdentity::from_dialog(&dialog);
        assert_eq!(identity.numeric_id, "1234567890");
        assert_eq!(identity.dialog_id, -1001234567890);
        assert_eq!(identity.name, "Rust News");
    }

    #[test]
    fn test_keeps_ids_without_prefix() {
        let dialog = Dialog {
            name: "Friend".into(),
            id: 777,
        };
        assert_eq!(ChannelIdentity::from_dialog(&dialog).numeric_id, "777");
    }

    #[test]
    fn test_post_url() {
        let identity = ChannelIdentity::from_dialog(&Dialog {
            name: "Rust News".into(),
            id: -1001234,
        });
        assert_eq!(
            identity.post_url("https://t.me/", 42),
            "https://t.me/c/1234/42"
        );
    }
}
