//! HTTP API: upload endpoint, response types, and log streaming.

pub mod logs;
pub mod server;
pub mod types;
