use actix_web::http::header::{self, ContentEncoding};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use tokio::sync::mpsc;
use validator::Validate;

use crate::models::{AnalyzeQuery, HealthResponse, StreamEvent};
use crate::services::{AnalysisError, Analyzer, RenderClient};

/// Events buffered between the pipeline and a slow client
const EVENT_BUFFER: usize = 16;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer<RenderClient>>,
}

/// Configure the landing page, analysis stream and health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(index))
        .route("/analyze", web::get().to(analyze))
        .route("/health", web::get().to(health_check));
}

async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Analysis stream endpoint
///
/// GET /analyze?player_id={allyCode}
///
/// Responds with `text/event-stream`. Every event is a `data: <json>` line:
/// `{"progress": n}` while working, then one terminal event, either
/// `{"done": true, "error": "..."}` or `{"done": true, "wins": {...}, "losses": {...}}`.
async fn analyze(
    state: web::Data<AppState>,
    query: web::Query<AnalyzeQuery>,
) -> impl Responder {
    let query = query.into_inner().normalized();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    if let Err(errors) = query.validate() {
        tracing::info!("Rejected analyze request: {}", errors);
        let _ = tx.try_send(StreamEvent::failed(AnalysisError::EmptyPlayerId.to_string()));
        return event_stream(rx);
    }

    tracing::info!("Starting analysis for player: {}", query.player_id);

    let analyzer = Arc::clone(&state.analyzer);
    actix_web::rt::spawn(async move {
        let _ = analyzer.run(&query.player_id, &tx).await;
    });

    event_stream(rx)
}

/// Stream events as SSE frames until the sender side closes
fn event_stream(rx: mpsc::Receiver<StreamEvent>) -> HttpResponse {
    let frames = futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((event.to_sse_frame().map(web::Bytes::from), rx))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        // keeps the compression middleware from holding frames back
        .insert_header(ContentEncoding::Identity)
        .streaming(frames)
}
