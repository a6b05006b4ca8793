//! Server-Sent Events support

pub mod broadcaster;

pub use broadcaster::EventBroadcaster;
