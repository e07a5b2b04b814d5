// src/livereload/server.rs

//! HTTP side of live reload: `GET /events` (SSE) and `GET /livereload.js`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::stream::Stream;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::errors::Result;

use super::broadcaster::{Broadcaster, ClientKey};

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

const CLIENT_SCRIPT: &str = include_str!("livereload.js");

pub fn router(broadcaster: Broadcaster) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/events", get(events))
        .route("/livereload.js", get(client_script))
        .with_state(broadcaster)
        .layer(cors)
}

/// Bind the live-reload port on the loopback interface.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding live-reload server to {addr}"))?;
    Ok(listener)
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, broadcaster: Broadcaster) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("live-reload server listening on http://{addr}");
    }
    axum::serve(listener, router(broadcaster))
        .await
        .context("live-reload server")?;
    Ok(())
}

/// Unregisters its client when the SSE stream is dropped (browser went away).
struct ClientGuard {
    key: ClientKey,
    broadcaster: Broadcaster,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.key);
    }
}

async fn events(
    State(broadcaster): State<Broadcaster>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, StatusCode>
{
    let client = broadcaster.register().await.map_err(|e| {
        warn!(error = %e, "could not register live-reload client");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    let guard = ClientGuard {
        key: client.key,
        broadcaster,
    };

    let stream = ReceiverStream::new(client.rx).map(move |msg| {
        let _keep = &guard;
        Ok(Event::default().data(msg.to_json()))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}
