//! signshuffle Gateway HTTP API Server
//!
//! Hosts the two oracle-backed endpoints: letter extraction from an uploaded image
//! and sentence generation from a letter budget.

pub mod error;
pub mod extraction;
pub mod functions;
pub mod generation;
pub mod health_api;
pub mod prompts;
pub mod server;

pub use error::GatewayError;
pub use server::{GatewayState, build_router, start_server};
