use reqwest::Method;
use reqwest::multipart::{Form, Part};

use crate::types::{MediaDownload, MediaUploadResponse};
use crate::{WabaClient, WabaResult, decode};

impl WabaClient {
    /// Upload a media object and return its id for use in an outbound
    /// message. The gateway expects a `file` part plus a `type` field
    /// carrying the MIME type.
    pub async fn upload_media(
        &self,
        phone_number_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> WabaResult<String> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("type", content_type.to_string());

        let response = self
            .request(Method::POST, "/media")
            .query(&[("phone_number_id", phone_number_id)])
            .multipart(form)
            .send()
            .await?;
        let upload: MediaUploadResponse = decode(response).await?;
        Ok(upload.id)
    }

    /// Download a media object through the gateway proxy.
    pub async fn download_media(
        &self,
        phone_number_id: &str,
        media_id: &str,
    ) -> WabaResult<MediaDownload> {
        let response = self
            .request(Method::GET, &format!("/media/{media_id}"))
            .query(&[("phone_number_id", phone_number_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::WabaError::api(status.as_u16(), body));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(MediaDownload { content_type, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stub;
    use axum::extract::{Multipart, Path, Query};
    use axum::http::header;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default)]
    struct UploadSeen {
        filename: String,
        file_type: String,
        file_len: usize,
        type_field: String,
    }

    #[tokio::test]
    async fn upload_sends_file_part_and_type_field() {
        let seen: Arc<Mutex<UploadSeen>> = Arc::default();
        let capture = seen.clone();
        let app = Router::new().route(
            "/media",
            post(
                move |Query(query): Query<HashMap<String, String>>, mut multipart: Multipart| {
                    let capture = capture.clone();
                    async move {
                        assert_eq!(query["phone_number_id"], "pn-1");
                        let mut parts = UploadSeen::default();
                        while let Some(field) = multipart.next_field().await.unwrap() {
                            match field.name().unwrap_or_default() {
                                "file" => {
                                    parts.filename =
                                        field.file_name().unwrap_or_default().to_string();
                                    parts.file_type =
                                        field.content_type().unwrap_or_default().to_string();
                                    parts.file_len = field.bytes().await.unwrap().len();
                                }
                                "type" => parts.type_field = field.text().await.unwrap(),
                                _ => {}
                            }
                        }
                        *capture.lock().unwrap() = parts;
                        Json(json!({ "id": "media-77" }))
                    }
                },
            ),
        );
        let base = test_stub::serve(app).await;
        let client = WabaClient::with_base_url("k", base);

        let media_id = client
            .upload_media("pn-1", "foto.jpg", "image/jpeg", vec![0xFF; 2048])
            .await
            .unwrap();
        assert_eq!(media_id, "media-77");

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.filename, "foto.jpg");
        assert_eq!(seen.file_type, "image/jpeg");
        assert_eq!(seen.file_len, 2048);
        assert_eq!(seen.type_field, "image/jpeg");
    }

    #[tokio::test]
    async fn download_returns_bytes_with_content_type() {
        let app = Router::new().route(
            "/media/{id}",
            get(|Path(id): Path<String>| async move {
                assert_eq!(id, "media-9");
                ([(header::CONTENT_TYPE, "image/png")], vec![1u8, 2, 3, 4])
            }),
        );
        let base = test_stub::serve(app).await;
        let client = WabaClient::with_base_url("k", base);

        let download = client.download_media("pn-1", "media-9").await.unwrap();
        assert_eq!(download.content_type, "image/png");
        assert_eq!(download.bytes, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn download_failures_become_api_errors() {
        let app = Router::new().route(
            "/media/{id}",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "media expired") }),
        );
        let base = test_stub::serve(app).await;
        let client = WabaClient::with_base_url("k", base);

        let err = client.download_media("pn-1", "media-0").await.unwrap_err();
        assert_eq!(err.to_string(), "API error (404): media expired");
    }
}
