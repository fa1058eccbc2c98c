use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::RenderConfig;
use crate::domain::{ChannelIdentity, Comment, Post};

const FENCE: &str = "```";
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const HEADING_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";

/// Puts every code fence on a line of its own so embedded fences cannot
/// open or close a block in the surrounding document.
pub fn isolate_fences(text: &str) -> String {
    text.replace(FENCE, "\n```\n")
}

/// Markdown document for a post and its thread.
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    config: RenderConfig,
}

impl DocumentRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, post: &Post, channel: &ChannelIdentity) -> String {
        let mut doc = self.front_matter(post, channel);
        doc.push_str("\n\n\n");

        let _ = writeln!(
            doc,
            "## {} {}",
            self.config.post_label,
            heading_time(&post.timestamp)
        );
        self.push_body(&mut doc, post.body.as_deref());
        doc.push_str(&post.reactions.summary());
        doc.push_str("\n\n");

        let _ = writeln!(doc, "### {}", self.config.comments_heading);
        for comment in &post.comments {
            self.push_comment(&mut doc, comment);
        }

        doc
    }

    fn front_matter(&self, post: &Post, channel: &ChannelIdentity) -> String {
        format!(
            "---\nchannel: {}\nurl: {}\ncreated-at: {}\n---",
            channel.name,
            channel.post_url(&self.config.link_base, post.id),
            post.timestamp.format(CREATED_AT_FORMAT)
        )
    }

    fn push_comment(&self, doc: &mut String, comment: &Comment) {
        let _ = writeln!(
            doc,
            "#### {} {}",
            comment.sender.render(&self.config.link_base),
            heading_time(&comment.timestamp)
        );

        if let Some(quote) = comment.quoted_excerpt.as_deref().filter(|q| !q.is_empty()) {
            for line in isolate_fences(quote).lines() {
                let _ = writeln!(doc, "> {}", line);
            }
            doc.push('\n');
        }

        self.push_body(doc, comment.body.as_deref());
        doc.push_str(&comment.reactions.summary());
        doc.push_str("\n\n");
    }

    fn push_body(&self, doc: &mut String, body: Option<&str>) {
        match body.filter(|b| !b.is_empty()) {
            Some(text) => doc.push_str(&isolate_fences(text)),
            None => doc.push_str(&self.config.empty_text),
        }
        doc.push('\n');
    }
}

fn heading_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(HEADING_FORMAT).to_string()
}
