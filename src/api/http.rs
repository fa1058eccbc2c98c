use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::api::{MessageQuery, MessagingApi, PeerRef, RawMessage, SenderRecord};
use crate::app::{ArchiveError, Result};
use crate::config::ApiConfig;
use crate::domain::{ChannelIdentity, Dialog};

/// Error code the service returns when an id in the request no longer
/// points at a message.
const MSG_ID_INVALID: &str = "MSG_ID_INVALID";

#[derive(Deserialize)]
struct DialogPage {
    dialogs: Vec<Dialog>,
    #[serde(default)]
    next_offset: Option<u64>,
}

#[derive(Deserialize)]
struct MessagePage {
    messages: Vec<RawMessage>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

struct DialogCursor {
    offset: Option<u64>,
    buffer: VecDeque<Dialog>,
}

struct MessageCursor {
    offset_id: i64,
    remaining: Option<usize>,
    buffer: VecDeque<RawMessage>,
    exhausted: bool,
}

/// Client for a JSON messaging bridge that owns the user session.
///
/// Endpoints, relative to `base_url`:
/// - `GET dialogs?offset=&limit=`
/// - `GET channels/{id}/messages?limit=&offset_id=[&reply_to=]`
/// - `GET peers/{user|channel}/{id}`
pub struct HttpApi {
    client: Client,
    base_url: Url,
    page_size: usize,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_id) = config.api_id {
            headers.insert("x-api-id", HeaderValue::from(api_id));
        }
        if let Some(api_hash) = &config.api_hash {
            let value = HeaderValue::from_str(api_hash)
                .map_err(|e| ArchiveError::Config(format!("Invalid api_hash: {}", e)))?;
            headers.insert("x-api-hash", value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("chanarchive/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        // `Url::join` drops the last path segment unless it ends in '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            page_size: config.page_size.max(1),
        })
    }

    async fn fetch_dialog_page(&self, offset: u64) -> Result<DialogPage> {
        let mut url = self.base_url.join("dialogs")?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &self.page_size.to_string());

        let response = self.client.get(url).send().await?;
        let response = check_status(response, None).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn next_dialog(&self, mut cursor: DialogCursor) -> Result<Option<(Dialog, DialogCursor)>> {
        loop {
            if let Some(dialog) = cursor.buffer.pop_front() {
                return Ok(Some((dialog, cursor)));
            }
            let Some(offset) = cursor.offset else {
                return Ok(None);
            };

            let page = self.fetch_dialog_page(offset).await?;
            tracing::debug!("Fetched {} dialogs at offset {}", page.dialogs.len(), offset);
            if page.dialogs.is_empty() {
                return Ok(None);
            }
            cursor.offset = page.next_offset;
            cursor.buffer.extend(page.dialogs);
        }
    }

    async fn fetch_message_page(
        &self,
        channel: &ChannelIdentity,
        query: &MessageQuery,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        let mut url = self
            .base_url
            .join(&format!("channels/{}/messages", channel.dialog_id))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("limit", &limit.to_string())
                .append_pair("offset_id", &offset_id.to_string());
            if let Some(reply_to) = query.reply_to {
                pairs.append_pair("reply_to", &reply_to.to_string());
            }
        }

        let response = self.client.get(url).send().await?;
        let response = check_status(response, query.reply_to).await?;
        let page: MessagePage = serde_json::from_slice(&response.bytes().await?)?;
        Ok(page.messages)
    }

    async fn next_message(
        &self,
        channel: &ChannelIdentity,
        query: MessageQuery,
        mut cursor: MessageCursor,
    ) -> Result<Option<(RawMessage, MessageCursor)>> {
        loop {
            if cursor.remaining == Some(0) {
                return Ok(None);
            }
            if let Some(message) = cursor.buffer.pop_front() {
                cursor.offset_id = message.id;
                if let Some(remaining) = cursor.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(Some((message, cursor)));
            }
            if cursor.exhausted {
                return Ok(None);
            }

            let limit = cursor
                .remaining
                .map_or(self.page_size, |r| r.min(self.page_size));
            let page = self
                .fetch_message_page(channel, &query, cursor.offset_id, limit)
                .await?;

            if page.len() < limit {
                cursor.exhausted = true;
            }
            // Guard against a bridge that ignores offset_id
            let offset_id = cursor.offset_id;
            cursor
                .buffer
                .extend(page.into_iter().filter(|m| m.id > offset_id));
            if cursor.buffer.is_empty() {
                return Ok(None);
            }
        }
    }
}

/// Map the bridge's error responses onto the archive taxonomy.
async fn check_status(response: Response, reply_to: Option<i64>) -> Result<Response> {
    if response.status() == StatusCode::BAD_REQUEST {
        let body = response.bytes().await?;
        return Err(bad_request_error(&body, reply_to));
    }

    response.error_for_status_ref()?;
    Ok(response)
}

/// A 400 naming `MSG_ID_INVALID` means the post cannot be replied to on a
/// thread query, and a vanished history entry otherwise.
fn bad_request_error(body: &[u8], reply_to: Option<i64>) -> ArchiveError {
    let reason = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    match reply_to {
        Some(post_id) if reason == MSG_ID_INVALID => ArchiveError::ReplyTargetMissing(post_id),
        _ if reason == MSG_ID_INVALID => ArchiveError::TransientFetch {
            post_id: None,
            reason,
        },
        _ => ArchiveError::Api(reason),
    }
}

#[async_trait]
impl MessagingApi for HttpApi {
    fn list_dialogs(&self) -> BoxStream<'_, Result<Dialog>> {
        let cursor = DialogCursor {
            offset: Some(0),
            buffer: VecDeque::new(),
        };
        stream::try_unfold(cursor, move |cursor| self.next_dialog(cursor)).boxed()
    }

    fn iter_messages<'a>(
        &'a self,
        channel: &'a ChannelIdentity,
        query: MessageQuery,
    ) -> BoxStream<'a, Result<RawMessage>> {
        let cursor = MessageCursor {
            offset_id: query.offset_id,
            remaining: query.limit,
            buffer: VecDeque::new(),
            exhausted: false,
        };
        stream::try_unfold(cursor, move |cursor| {
            self.next_message(channel, query, cursor)
        })
        .boxed()
    }

    async fn get_sender(&self, message: &RawMessage) -> Result<Option<SenderRecord>> {
        let path = match message.from {
            Some(PeerRef::User(id)) => format!("peers/user/{}", id),
            Some(PeerRef::Channel(id)) => format!("peers/channel/{}", id),
            None => return Ok(None),
        };

        let url = self.base_url.join(&path)?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, None).await?;
        Ok(Some(serde_json::from_slice(&response.bytes().await?)?))
    }
}
