//! Command dispatch for the node
//!
//! This module handles:
//! - Matching inbound payloads against the command catalog
//! - Dispatching to the query and switch handlers
//! - Queuing replies tagged with the request sequence number

mod dispatcher;
pub mod handlers;
mod outbound;

pub use dispatcher::CommandDispatcher;
pub use outbound::outbound_queue;
