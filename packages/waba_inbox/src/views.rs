use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use maud::{DOCTYPE, PreEscaped, html};

use crate::AppState;

const CSS: &str = r#"
    body {
        margin: 0;
        min-height: 100vh;
        display: flex;
        align-items: center;
        justify-content: center;
        background: #0f172a;
        color: #e2e8f0;
        font-family: -apple-system, 'Segoe UI', Roboto, sans-serif;
    }

    .card {
        background: #1e293b;
        border: 1px solid #334155;
        border-radius: 0.75rem;
        padding: 2rem 2.5rem;
        min-width: 22rem;
    }

    h1 {
        margin: 0;
        font-size: 1.5rem;
    }

    .muted {
        color: #94a3b8;
        font-size: 0.875rem;
        margin-top: 0.25rem;
    }

    ul {
        list-style: none;
        padding: 0;
        margin: 1.5rem 0 0;
    }

    li {
        display: flex;
        align-items: center;
        gap: 0.5rem;
        padding: 0.375rem 0;
        font-size: 0.9375rem;
    }

    .dot {
        width: 0.5rem;
        height: 0.5rem;
        border-radius: 50%;
        flex-shrink: 0;
    }

    .dot.ok { background: #4ade80; }
    .dot.warn { background: #facc15; }

    code {
        background: #0f172a;
        border-radius: 0.25rem;
        padding: 0.125rem 0.375rem;
        font-size: 0.8125rem;
    }

    a { color: #60a5fa; }
"#;

/// Minimal status page. The real inbox UI is a separate frontend; this page
/// confirms the server is up and whether the provider is wired.
pub async fn index_page(State(state): State<AppState>) -> impl IntoResponse {
    let provider_ready = state
        .resolver
        .settings()
        .await
        .map(|s| s.api_key_set && s.phone_number_id.is_some())
        .unwrap_or(false);

    let markup = html! {
        (DOCTYPE)
        html {
            head {
                title { "WhatsApp Inbox" }
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                style { (PreEscaped(CSS)) }
            }
            body {
                div class="card" {
                    h1 { "WhatsApp Inbox" }
                    p class="muted" { "version " (env!("CARGO_PKG_VERSION")) }
                    ul {
                        @if provider_ready {
                            li { span class="dot ok" {} "WhatsApp provider configured" }
                        } @else {
                            li {
                                span class="dot warn" {}
                                "Provider not configured. Store credentials via "
                                code { "PUT /api/settings" }
                            }
                        }
                        li { span class="dot ok" {} "REST API at " code { "/api" } }
                        li { span class="dot ok" {} "Live sync at " code { "/ws" } }
                        li { a href="/health" { "Health check" } }
                    }
                }
            }
        }
    };

    Html(markup.into_string())
}
