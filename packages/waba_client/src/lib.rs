//! Typed client for the hosted WhatsApp Business API.
//!
//! Every endpoint is phone-number scoped: the caller passes the
//! `phone_number_id` (and for template listing the `waba_id`) on each call
//! so one client can serve several numbers. Authentication is a static
//! `X-API-Key` header.
//!
//! ```no_run
//! use waba_client::{ConversationQuery, WabaClient};
//!
//! # async fn demo() -> Result<(), waba_client::WabaError> {
//! let client = WabaClient::new("sk-live-...");
//! let conversations = client
//!     .list_conversations("123456789", &ConversationQuery::default())
//!     .await?;
//! println!("{} open conversations", conversations.len());
//! # Ok(())
//! # }
//! ```

mod conversations;
mod error;
mod media;
mod messages;
mod templates;
mod types;

pub use error::{WabaError, WabaResult};
pub use messages::OutboundMessage;
pub use types::{
    ConversationQuery, ConversationRecord, KapsoConversationFields, ListResponse, MediaDownload,
    MediaUploadResponse, MessageId, MessageRecord, SendMessageResponse, TemplateRecord, TextBody,
};

use reqwest::Method;
use serde::de::DeserializeOwned;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.kapso.ai/meta/whatsapp";

/// Client for the WhatsApp Business API gateway.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct WabaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WabaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root, e.g. a staging gateway.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("X-API-Key", &self.api_key)
    }
}

/// Read the body, map non-2xx to [`WabaError::Api`], then decode JSON.
pub(crate) async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> WabaResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(WabaError::api(status.as_u16(), body));
    }
    Ok(serde_json::from_str(&body)?)
}
