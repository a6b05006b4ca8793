//! REST API implementation for the Scan Engine

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};
