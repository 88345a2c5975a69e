//! Demo: live aggregation feed over Server-Sent Events.
//!
//! A synthetic generator stands in for the broker ingress adapter, pushing
//! one event every two seconds. Each connected client receives every raw
//! event plus each finished summary, framed with the crate's wire format.
//!
//! Run with:
//!   cargo run --example sse_stream
//!
//! Then, in another terminal:
//!   curl -N http://127.0.0.1:3000/stream
//!   curl http://127.0.0.1:3000/status

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use async_stream::stream;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use futures_util::StreamExt;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use streamsum::broadcast::WireFrame;
use streamsum::config::{AggregationConfig, BrokerConfig, HubConfig};
use streamsum::egress::LogPublisher;
use streamsum::service::AggregatorService;

async fn stream_feed(State(service): State<Arc<AggregatorService>>) -> Response {
    let subscription = match service.subscribe() {
        Ok(subscription) => subscription,
        Err(err) => return (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    };

    let body = stream! {
        yield Ok::<_, Infallible>(WireFrame::retry_hint(3000));
        let mut messages = Box::pin(subscription.into_async_stream());
        while let Some(message) = messages.next().await {
            match WireFrame::from_message(&message) {
                Ok(frame) => yield Ok(frame.render()),
                Err(err) => tracing::warn!(error = %err, "failed to frame message"),
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream;charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .body(Body::from_stream(body))
        .expect("static response headers")
}

async fn status(State(service): State<Arc<AggregatorService>>) -> impl IntoResponse {
    Json(service.status())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let broker = BrokerConfig::from_env();
    let aggregation = AggregationConfig::from_env()?;
    let service = Arc::new(AggregatorService::new(
        &aggregation,
        &HubConfig::default(),
        Arc::new(LogPublisher),
    ));
    service.start();

    // Synthetic ingress: one event every two seconds with a rolling counter.
    let intake = service.intake();
    tokio::spawn(async move {
        let mut counter: u64 = 0;
        let mut ticker = tokio::time::interval(Duration::from_secs(2));
        loop {
            ticker.tick().await;
            let body = json!({
                "payload": { "date": Utc::now().timestamp_millis(), "times": counter }
            })
            .to_string();
            if intake.send(body).is_err() {
                break;
            }
            counter += 1;
        }
    });

    let router = Router::new()
        .route("/stream", get(stream_feed))
        .route("/status", get(status))
        .with_state(Arc::clone(&service));

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        input_topic = %broker.input_topic,
        output_topic = %broker.output_topic,
        "serving demo feed on http://{addr}/stream"
    );

    tokio::select! {
        result = axum::serve(listener, router.into_make_service()) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            service.shutdown().await;
        }
    }

    Ok(())
}
