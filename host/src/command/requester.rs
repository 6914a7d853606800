//! Sends commands to the node and matches replies to requests

use crate::session::SessionHandle;
use anyhow::{anyhow, Result};
use climate_shared::{limits, now_ms, Command, Frame, Reply, ReplyError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration for outgoing requests
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// How long a query may go unanswered before it is retried
    pub reply_timeout: Duration,
    /// Retries before a query is given up
    pub max_retries: u32,
    /// Interval of the automatic `get_ardsta` poll
    pub status_poll_interval: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(limits::REPLY_TIMEOUT_MS),
            max_retries: limits::QUERY_MAX_RETRIES,
            status_poll_interval: Duration::from_secs(10),
        }
    }
}

/// A query sent to the node awaiting its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub sequence: u8,
    pub command: Command,
    pub sent_at: u64,
    pub timeout_ms: u64,
    pub retries: u32,
    pub max_retries: u32,
}

impl PendingRequest {
    /// Check if the reply is overdue at `now` (milliseconds)
    pub fn is_timed_out(&self, now: u64) -> bool {
        now > self.sent_at + self.timeout_ms
    }

    /// Check if this request can be retried
    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }
}

/// Outstanding queries keyed by sequence number
#[derive(Debug, Default)]
pub struct PendingRequests {
    by_sequence: HashMap<u8, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request, returning any older request that held the same sequence
    pub fn insert(&mut self, request: PendingRequest) -> Option<PendingRequest> {
        self.by_sequence.insert(request.sequence, request)
    }

    /// Resolve the request a reply answers.
    ///
    /// The reply key must match the command sent under that sequence; a
    /// mismatch leaves the request pending.
    pub fn complete(&mut self, reply: &Reply) -> Option<PendingRequest> {
        let request = self.by_sequence.get(&reply.sequence)?;
        if request.command.reply_key().as_deref() != Some(reply.key.as_str()) {
            return None;
        }
        self.by_sequence.remove(&reply.sequence)
    }

    pub fn get_mut(&mut self, sequence: u8) -> Option<&mut PendingRequest> {
        self.by_sequence.get_mut(&sequence)
    }

    pub fn remove(&mut self, sequence: u8) -> Option<PendingRequest> {
        self.by_sequence.remove(&sequence)
    }

    /// Requests overdue at `now`
    pub fn timed_out(&self, now: u64) -> Vec<PendingRequest> {
        let mut overdue: Vec<PendingRequest> = self
            .by_sequence
            .values()
            .filter(|r| r.is_timed_out(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|r| r.sent_at);
        overdue
    }

    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}

/// How an incoming reply relates to what was sent
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMatch {
    /// Answers a tracked query
    Matched { request: PendingRequest, reply: Reply },
    /// No tracked query for this sequence (late, duplicate, or after a retry gave up)
    Unsolicited(Reply),
}

/// Issues commands to the attached node and tracks their replies
pub struct Requester {
    config: RequestConfig,
    sequence: AtomicU8,
    session: RwLock<Option<SessionHandle>>,
    pending: RwLock<PendingRequests>,
}

impl Requester {
    pub fn new(config: RequestConfig) -> Self {
        Self {
            config,
            sequence: AtomicU8::new(0),
            session: RwLock::new(None),
            pending: RwLock::new(PendingRequests::new()),
        }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Get the next sequence number, wrapping after 255
    pub fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Route commands to a newly connected node
    pub async fn attach(&self, handle: SessionHandle) {
        info!("Node attached: {}", handle.addr);
        *self.session.write().await = Some(handle);
    }

    /// Forget the session for `addr` if it is still the current one
    pub async fn detach(&self, addr: SocketAddr) {
        let mut session = self.session.write().await;
        if !session.as_ref().is_some_and(|h| h.addr == addr) {
            return;
        }
        if let Some(handle) = session.take() {
            info!(
                "Node detached: {} (connected for {:?})",
                addr,
                handle.connected_at.elapsed()
            );
        }
    }

    async fn current_session(&self) -> Result<SessionHandle> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("No node connected"))
    }

    /// Send a command, returning the sequence number it went out with.
    ///
    /// Queries are tracked until answered; switch commands never reply and
    /// are not tracked.
    pub async fn send(&self, command: Command) -> Result<u8> {
        let session = self.current_session().await?;
        let sequence = self.next_sequence();

        if command.expects_reply() {
            let request = PendingRequest {
                sequence,
                command,
                sent_at: now_ms(),
                timeout_ms: self.config.reply_timeout.as_millis() as u64,
                retries: 0,
                max_retries: self.config.max_retries,
            };
            if let Some(stale) = self.pending.write().await.insert(request) {
                warn!(
                    "Sequence {} reused while {} was still pending",
                    sequence, stale.command
                );
            }
        }

        let frame = Frame::request(sequence, command.code().to_vec());
        if let Err(e) = session.send(&frame).await {
            self.pending.write().await.remove(sequence);
            return Err(e);
        }

        info!(">>> Sent {} (seq={})", command, sequence);
        Ok(sequence)
    }

    /// Parse reply text and resolve the query it answers
    pub async fn handle_reply(&self, text: &str) -> Result<ReplyMatch, ReplyError> {
        let reply = Reply::parse(text)?;

        match self.pending.write().await.complete(&reply) {
            Some(request) => {
                debug!(
                    "<<< Reply for {} (seq={}, retries={})",
                    request.command, request.sequence, request.retries
                );
                Ok(ReplyMatch::Matched { request, reply })
            }
            None => Ok(ReplyMatch::Unsolicited(reply)),
        }
    }

    /// Queries whose reply is overdue
    pub async fn timed_out(&self) -> Vec<PendingRequest> {
        self.pending.read().await.timed_out(now_ms())
    }

    /// Re-send an overdue query under its original sequence number
    pub async fn retry(&self, sequence: u8) -> Result<()> {
        let command = {
            let mut pending = self.pending.write().await;
            let Some(request) = pending.get_mut(sequence) else {
                return Ok(());
            };

            if !request.can_retry() {
                let command = request.command;
                pending.remove(sequence);
                return Err(anyhow!(
                    "{} (seq={}) exceeded max retries",
                    command,
                    sequence
                ));
            }

            request.retries += 1;
            request.sent_at = now_ms();
            info!(
                ">>> Retrying {} (seq={}, attempt {}/{})",
                request.command,
                sequence,
                request.retries + 1,
                request.max_retries + 1
            );
            request.command
        };

        let session = self.current_session().await?;
        session
            .send(&Frame::request(sequence, command.code().to_vec()))
            .await
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}
