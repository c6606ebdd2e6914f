use reqwest::Method;
use serde_json::{Map, Value, json};

use crate::types::SendMessageResponse;
use crate::{WabaClient, WabaResult, decode};

/// Message payloads accepted by [`WabaClient::send_message`].
///
/// Media variants reference a previously uploaded media id, see
/// [`WabaClient::upload_media`].
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Image {
        media_id: String,
        caption: Option<String>,
    },
    Video {
        media_id: String,
        caption: Option<String>,
    },
    Audio {
        media_id: String,
    },
    Document {
        media_id: String,
        caption: Option<String>,
        filename: Option<String>,
    },
    Template {
        name: String,
        language: String,
    },
}

impl OutboundMessage {
    /// The `type` discriminator on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Image { .. } => "image",
            OutboundMessage::Video { .. } => "video",
            OutboundMessage::Audio { .. } => "audio",
            OutboundMessage::Document { .. } => "document",
            OutboundMessage::Template { .. } => "template",
        }
    }

    fn payload(&self) -> Value {
        match self {
            OutboundMessage::Text { body } => json!({ "body": body }),
            OutboundMessage::Image { media_id, caption }
            | OutboundMessage::Video { media_id, caption } => {
                let mut object = Map::new();
                object.insert("id".to_string(), json!(media_id));
                if let Some(caption) = caption {
                    object.insert("caption".to_string(), json!(caption));
                }
                Value::Object(object)
            }
            OutboundMessage::Audio { media_id } => json!({ "id": media_id }),
            OutboundMessage::Document { media_id, caption, filename } => {
                let mut object = Map::new();
                object.insert("id".to_string(), json!(media_id));
                if let Some(caption) = caption {
                    object.insert("caption".to_string(), json!(caption));
                }
                if let Some(filename) = filename {
                    object.insert("filename".to_string(), json!(filename));
                }
                Value::Object(object)
            }
            OutboundMessage::Template { name, language } => {
                json!({ "name": name, "language": { "code": language } })
            }
        }
    }
}

impl WabaClient {
    /// Send one message to a recipient phone number (digits only, country
    /// code included).
    pub async fn send_message(
        &self,
        phone_number_id: &str,
        to: &str,
        message: &OutboundMessage,
    ) -> WabaResult<SendMessageResponse> {
        let mut body = Map::new();
        body.insert("messaging_product".to_string(), json!("whatsapp"));
        body.insert("to".to_string(), json!(to));
        body.insert("type".to_string(), json!(message.kind()));
        body.insert(message.kind().to_string(), message.payload());

        let response = self
            .request(Method::POST, "/messages")
            .query(&[("phone_number_id", phone_number_id)])
            .json(&Value::Object(body))
            .send()
            .await?;
        decode(response).await
    }

    /// Send a pre-approved template, the only kind allowed outside the
    /// 24-hour customer service window.
    pub async fn send_template(
        &self,
        phone_number_id: &str,
        to: &str,
        template_name: &str,
        language: &str,
    ) -> WabaResult<SendMessageResponse> {
        let message = OutboundMessage::Template {
            name: template_name.to_string(),
            language: language.to_string(),
        };
        self.send_message(phone_number_id, to, &message).await
    }
}
