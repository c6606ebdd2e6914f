use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;
use waba_client::{OutboundMessage, SendMessageResponse};

use crate::AppState;

/// Largest upload the provider accepts for any media kind.
const MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// Body ceiling for the send route: the media cap plus form overhead.
pub const MAX_REQUEST_BYTES: usize = MAX_FILE_SIZE + 64 * 1024;

/// Document MIME types accepted in addition to any image, video or audio.
const DOCUMENT_TYPES: [&str; 5] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, Clone, Copy)]
enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

fn classify_media(content_type: &str) -> Option<MediaKind> {
    if content_type.starts_with("image/") {
        Some(MediaKind::Image)
    } else if content_type.starts_with("video/") {
        Some(MediaKind::Video)
    } else if content_type.starts_with("audio/") {
        Some(MediaKind::Audio)
    } else if DOCUMENT_TYPES.contains(&content_type) {
        Some(MediaKind::Document)
    } else {
        None
    }
}

fn valid_phone(to: &str) -> bool {
    (10..=15).contains(&to.len()) && to.bytes().all(|b| b.is_ascii_digit())
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct SendForm {
    to: Option<String>,
    body: Option<String>,
    file: Option<UploadedFile>,
}

async fn read_form(multipart: &mut Multipart) -> anyhow::Result<SendForm> {
    let mut form = SendForm::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "to" => form.to = Some(field.text().await?),
            "body" => form.body = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().unwrap_or("archivo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Send a text or media message. Multipart fields: `to`, optional `body`,
/// optional `file`. With a file the body becomes the caption where the
/// message kind supports one.
pub async fn send_message(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to read send form: {:#}", e);
            return bad_request("Malformed multipart body");
        }
    };

    let Some(to) = form.to else {
        return bad_request("Missing required field: to");
    };
    if !valid_phone(&to) {
        return bad_request("Invalid phone number format");
    }

    let body = form.body.filter(|body| !body.is_empty());

    let outcome = if let Some(file) = form.file {
        if file.bytes.len() > MAX_FILE_SIZE {
            return bad_request("File size exceeds 16MB limit");
        }
        let Some(kind) = classify_media(&file.content_type) else {
            return bad_request("File type not allowed");
        };
        send_media(&state, &to, body, file, kind).await
    } else if let Some(body) = body {
        send_text(&state, &to, body).await
    } else {
        return bad_request("Either body or file is required");
    };

    match outcome {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("Failed to send message: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn send_text(
    state: &AppState,
    to: &str,
    body: String,
) -> anyhow::Result<SendMessageResponse> {
    let client = state.resolver.client().await?;
    let phone_number_id = state.resolver.phone_number_id().await?;
    Ok(client
        .send_message(&phone_number_id, to, &OutboundMessage::Text { body })
        .await?)
}

async fn send_media(
    state: &AppState,
    to: &str,
    caption: Option<String>,
    file: UploadedFile,
    kind: MediaKind,
) -> anyhow::Result<SendMessageResponse> {
    let client = state.resolver.client().await?;
    let phone_number_id = state.resolver.phone_number_id().await?;
    let media_id = client
        .upload_media(
            &phone_number_id,
            &file.filename,
            &file.content_type,
            file.bytes,
        )
        .await?;

    let message = match kind {
        MediaKind::Image => OutboundMessage::Image { media_id, caption },
        MediaKind::Video => OutboundMessage::Video { media_id, caption },
        MediaKind::Audio => OutboundMessage::Audio { media_id },
        MediaKind::Document => OutboundMessage::Document {
            media_id,
            caption,
            filename: Some(file.filename),
        },
    };
    Ok(client.send_message(&phone_number_id, to, &message).await?)
}

#[derive(Deserialize)]
pub struct SendTemplateRequest {
    to: String,
    template_name: String,
    language: String,
}

/// Send a pre-approved template, the only option outside the 24-hour
/// service window.
pub async fn send_template(
    State(state): State<AppState>,
    Json(req): Json<SendTemplateRequest>,
) -> Response {
    if !valid_phone(&req.to) {
        return bad_request("Invalid phone number format");
    }

    let result = async {
        let client = state.resolver.client().await?;
        let phone_number_id = state.resolver.phone_number_id().await?;
        let response = client
            .send_template(&phone_number_id, &req.to, &req.template_name, &req.language)
            .await?;
        anyhow::Ok(response)
    }
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("Failed to send template: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let result = async {
        let client = state.resolver.client().await?;
        let waba_id = state.resolver.waba_id().await?;
        let templates = client.list_templates(&waba_id).await?;
        anyhow::Ok(templates)
    }
    .await;

    match result {
        Ok(templates) => Ok(Json(templates)),
        Err(e) => {
            error!("Failed to list templates: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Proxy a media download so the browser never needs provider credentials.
pub async fn get_media(State(state): State<AppState>, Path(media_id): Path<String>) -> Response {
    let result = async {
        let client = state.resolver.client().await?;
        let phone_number_id = state.resolver.phone_number_id().await?;
        let download = client.download_media(&phone_number_id, &media_id).await?;
        anyhow::Ok(download)
    }
    .await;

    match result {
        Ok(download) => (
            [(header::CONTENT_TYPE, download.content_type)],
            download.bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to download media {}: {:#}", media_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
