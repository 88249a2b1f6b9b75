//! Inbound HTTP surface: POST /chat, GET /healthz, GET /metrics.
//!
//! The request boundary converts pipeline errors into the fixed,
//! non-technical payload; the caller sees either a valid reply or one
//! uniform apology, never a provider error.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::metrics;
use crate::pipeline::Pipeline;
use crate::prompts::FALLBACK_REPLY;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    input: String,
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Full::from(body.to_string()))
        .unwrap()
}

async fn chat_response(
    req: Request<Incoming>,
    pipeline: Arc<Pipeline>,
) -> Response<Full<Bytes>> {
    let start = Instant::now();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!("failed to read request body: {}", err);
            metrics::record_request("chat", start.elapsed(), "bad_request");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "input is required" }),
            );
        }
    };

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            metrics::record_request("chat", start.elapsed(), "bad_request");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "input is required" }),
            );
        }
    };

    if request.input.trim().is_empty() {
        metrics::record_request("chat", start.elapsed(), "bad_request");
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "input is required" }),
        );
    }

    match pipeline.chat(&request.input).await {
        Ok(reply) => {
            metrics::record_request("chat", start.elapsed(), "ok");
            json_response(StatusCode::OK, json!({ "reply": reply }))
        }
        Err(err) => {
            // The one user-visible failure: log the real cause server-side,
            // answer with the fixed apology.
            error!("chat request failed: {}", err);
            metrics::record_request("chat", start.elapsed(), "fallback");
            json_response(StatusCode::BAD_GATEWAY, json!({ "error": FALLBACK_REPLY }))
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    pipeline: Arc<Pipeline>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/chat") => Ok(chat_response(req, pipeline).await),
        (&Method::GET, "/healthz") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::from("ok"))
            .unwrap()),
        (&Method::GET, "/metrics") => metrics::metrics_response().await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap()),
    }
}

/// Accept loop; runs until ctrl-c.
pub async fn serve(addr: SocketAddr, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    metrics::init_collectors();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "companion chat endpoint started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let pipeline = Arc::clone(&pipeline);
                let service = service_fn(move |req| handle_request(req, Arc::clone(&pipeline)));
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        warn!(?peer, "connection error: {}", err);
                    }
                });
            }
        }
    }
}
