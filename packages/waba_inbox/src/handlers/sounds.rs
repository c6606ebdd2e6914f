use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use convo_sync::ChimeSound;

/// Serve the synthesized alert sounds. The browser fetches these once and
/// plays them from cache.
pub async fn get_sound(Path(name): Path<String>) -> Response {
    let sound = if name == ChimeSound::Message.file_name() {
        ChimeSound::Message
    } else if name == ChimeSound::Handoff.file_name() {
        ChimeSound::Handoff
    } else {
        return StatusCode::NOT_FOUND.into_response();
    };

    ([(header::CONTENT_TYPE, "audio/wav")], sound.wav_bytes()).into_response()
}
