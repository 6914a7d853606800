//! Command requests and reply correlation for the host
//!
//! This module handles:
//! - Numbering outgoing commands with wrapping sequence numbers
//! - Tracking queries until their reply arrives
//! - Retrying queries that go unanswered

mod requester;
mod timeout;

pub use requester::{PendingRequest, PendingRequests, ReplyMatch, RequestConfig, Requester};
pub use timeout::TimeoutTracker;
