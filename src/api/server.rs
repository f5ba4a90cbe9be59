//! HTTP server for the cellforge API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                |
//! |--------|-------------------|--------------------------------------------|
//! | GET    | `/health`         | Health check                               |
//! | POST   | `/api/transform`  | Upload a file, transform one column        |
//! | GET    | `/api/logs`       | SSE stream for real-time pipeline logs     |
//!
//! `POST /api/transform` takes multipart form data: `file` (the
//! upload), `column` (designated column), `transform` (built-in
//! transform spec, e.g. `reverse` or `mask:4`), and optionally
//! `concurrency`. The response carries the transformed file content
//! and a derived download name.

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BUS;
use super::types::{error_response, TransformResponse};
use crate::error::{PipelineError, ServerError};
use crate::transform::cell::{BuiltinTransform, CellTransform};
use crate::transform::pipeline::{transform_bytes, TransformOptions};

/// Start the HTTP server.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("cellforge server on http://localhost:{}", port);
    println!("  POST /api/transform - Upload file, transform a column");
    println!("  GET  /api/logs      - SSE log stream");
    println!("  GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cellforge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BUS.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Fields collected from the multipart upload.
#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    column: Option<String>,
    transform: Option<String>,
    concurrency: Option<usize>,
}

/// Upload-and-transform endpoint.
async fn transform_upload(
    multipart: Multipart,
) -> Result<Json<TransformResponse>, (StatusCode, Json<Value>)> {
    let form = read_form(multipart).await.map_err(reject)?;

    let bytes = form
        .file
        .ok_or_else(|| reject(ServerError::BadRequest("No file provided".into())))?;
    let column = form
        .column
        .ok_or_else(|| reject(ServerError::BadRequest("No column provided".into())))?;
    let spec = form.transform.unwrap_or_else(|| "reverse".to_string());
    let upload_name = form.file_name.unwrap_or_else(|| "upload.csv".to_string());

    let transform: BuiltinTransform = spec
        .parse()
        .map_err(|e: PipelineError| reject(ServerError::Pipeline(e)))?;

    println!(
        "upload: {} ({} bytes), column '{}', transform '{}'",
        upload_name,
        bytes.len(),
        column,
        transform.name()
    );

    let options = TransformOptions {
        concurrency: form.concurrency.unwrap_or(1),
        ..Default::default()
    };

    let result = transform_bytes(&bytes, &column, &transform, options)
        .await
        .map_err(|e| reject(ServerError::Pipeline(e)))?;

    Ok(Json(TransformResponse::from_output(
        result,
        &upload_name,
        &column,
        transform.name(),
    )))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(|s| s.to_string());
                form.file = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            "column" => form.column = Some(read_text(field).await?),
            "transform" => form.transform = Some(read_text(field).await?),
            "concurrency" => {
                let text = read_text(field).await?;
                form.concurrency = Some(text.parse().map_err(|_| {
                    ServerError::BadRequest(format!("Invalid concurrency: {}", text))
                })?);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ServerError> {
    field
        .text()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))
}

/// Map a server error to an HTTP rejection.
fn reject(error: ServerError) -> (StatusCode, Json<Value>) {
    let status = match &error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Format(_))
        | ServerError::Pipeline(PipelineError::UnknownTransform(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_response(&error.to_string())))
}
