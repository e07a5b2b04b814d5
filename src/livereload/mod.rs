// src/livereload/mod.rs

//! Live-reload: reload messages, the broadcast coordinator and the SSE server.

pub mod broadcaster;
pub mod message;
pub mod server;

pub use broadcaster::{must_reload_broadcast, Broadcaster, ClientKey, LiveClient};
pub use message::ReloadMessage;
pub use server::{bind, router, serve, KEEP_ALIVE_INTERVAL};
