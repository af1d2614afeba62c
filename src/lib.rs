//! AI API Gateway Library
//!
//! A server-side gateway between mobile clients and a third-party
//! generative-AI HTTP API: JWT bearer authentication, per-client
//! sliding-window rate limiting backed by a persistent store, upstream
//! forwarding with credential injection, and a uniform JSON response
//! envelope.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod observability;
pub mod rate_limit;
pub mod secrets;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::HttpServer;
