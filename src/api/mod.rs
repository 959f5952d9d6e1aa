//! HTTP surface of a hosted agent.
//!
//! ## Endpoints
//!
//! - `GET /.well-known/agent-card.json` - A2A agent card (no auth)
//! - `POST /` - A2A JSON-RPC (`message/send`)
//! - `GET /health` - Liveness and version

pub mod auth;
pub mod card;
mod routes;
pub mod rpc;
pub mod types;

pub use routes::{router, serve, AppState};
