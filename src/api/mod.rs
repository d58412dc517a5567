//! HTTP and WebSocket surface
//!
//! Bearer-token authenticated game endpoints, a spectator WebSocket for
//! the shared crash round, and the usual health and metrics plumbing.

pub mod errors;
pub mod games;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::ApiServer;
