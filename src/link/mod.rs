//! Frame transport between the node and its host controller
//!
//! Supports TCP for development and serial for the real radio bridge.
//! Reconnects with exponential backoff when the link drops.

mod manager;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use manager::{LinkConfig, LinkEvent, LinkManager, LinkTransport};
