//! Request body capture.
//!
//! The inbound body can only be read once. Capturing reads it fully into an
//! owned buffer, hands back a fresh body over that buffer for forwarding, and
//! keeps a snapshot of the same bytes for the request log.

use axum::body::Body;
use bytes::Bytes;
use hyper::body::Body as _;

use crate::error::error_chain;

/// Largest body prefix written to the log.
pub const MAX_BODY_LOG: usize = 10 * 1024;

/// Log-only view of a request body.
#[derive(Debug, Clone)]
pub struct BodySnapshot {
    bytes: Bytes,
}

impl BodySnapshot {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Full length of the body, regardless of how much is displayed.
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True iff the body is longer than [`MAX_BODY_LOG`].
    pub fn is_truncated(&self) -> bool {
        self.bytes.len() > MAX_BODY_LOG
    }

    /// The prefix that goes in the log, never longer than [`MAX_BODY_LOG`].
    pub fn displayed(&self) -> &[u8] {
        &self.bytes[..self.bytes.len().min(MAX_BODY_LOG)]
    }
}

/// Outcome of reading a request body for logging.
#[derive(Debug, Clone)]
pub enum CapturedBody {
    /// The request carries no body; nothing was read.
    Absent,
    /// The body was read completely (it may still be zero-length).
    Read(BodySnapshot),
    /// Reading failed; the detail replaces the content in the log.
    Failed(String),
}

/// Read `body` to completion and return its snapshot plus a replacement body.
///
/// The replacement yields exactly the bytes that were read. If reading fails
/// the replacement is empty and the exchange carries on without the body.
pub async fn capture(body: Body) -> (CapturedBody, Body) {
    if body.size_hint().exact() == Some(0) {
        return (CapturedBody::Absent, body);
    }

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let replacement = Body::from(bytes.clone());
            (CapturedBody::Read(BodySnapshot::new(bytes)), replacement)
        }
        Err(e) => (CapturedBody::Failed(error_chain(&e)), Body::empty()),
    }
}
