use serde::{Deserialize, Serialize};

/// Who wrote a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderIdentity {
    NamedUser {
        display_name: String,
        handle: Option<String>,
    },
    ChannelActor {
        title: String,
        handle: Option<String>,
    },
    ForbiddenChannel {
        title: String,
        id: i64,
    },
    Unknown,
}

impl SenderIdentity {
    /// Markdown link used in comment subheadings.
    ///
    /// The channel forms end in a stray `]`; existing archives carry it, so
    /// new documents keep it too.
    pub fn render(&self, link_base: &str) -> String {
        let base = link_base.trim_end_matches('/');
        match self {
            SenderIdentity::NamedUser {
                display_name,
                handle,
            } => format!("[{}]({}/{})", display_name, base, handle_or_placeholder(handle)),
            SenderIdentity::ChannelActor { title, handle } => {
                format!("[{}]({}/{})]", title, base, handle_or_placeholder(handle))
            }
            SenderIdentity::ForbiddenChannel { title, id } => {
                format!("[{}](ChannelForbiddenID={})]", title, id)
            }
            SenderIdentity::Unknown => "[Channel](t.me/?)".to_string(),
        }
    }
}

fn handle_or_placeholder(handle: &Option<String>) -> &str {
    handle.as_deref().unwrap_or("?")
}
