//! The boundary between the bridge core and a bot transport.
//!
//! # Overview
//!
//! A transport is split in two halves:
//!
//! | Half | Trait | Role |
//! |------|-------|------|
//! | Submission | [`Transport`] | Accepts outbound calls synchronously; never blocks. |
//! | Driver | [`TransportDriver`] | Long-running task that talks to the remote API and reports back through [`TransportEvent`]s. |
//!
//! Completions are never run by the transport itself. The driver hands the
//! [`PendingCall`] back inside [`TransportEvent::Completed`] so the event loop
//! that dispatches updates also runs completions, one event at a time.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::foundation::descriptor::{NativeRecord, RawRecord};
use crate::foundation::error::SubmitResult;

/// A serialized outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Protocol method name, e.g. `sendMessage`.
    pub method: String,
    /// JSON object text sent as the request body.
    pub body: String,
}

impl OutboundRequest {
    /// Creates a request.
    pub fn new(method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            body: body.into(),
        }
    }

    /// Parses the body back into JSON.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

type Completion = Box<dyn FnOnce(&dyn NativeRecord) + Send>;

/// The completion side of an accepted outbound call.
///
/// Consuming [`complete`](Self::complete) is the only way to run the
/// completion, so it runs at most once. A pending call dropped without being
/// completed never runs it.
pub struct PendingCall {
    id: u64,
    method: String,
    completion: Completion,
}

impl PendingCall {
    pub(crate) fn new(id: u64, method: String, completion: Completion) -> Self {
        Self {
            id,
            method,
            completion,
        }
    }

    /// Returns the correlator-assigned call id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the method the call was issued for.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Runs the completion with the native response record.
    pub fn complete(self, record: &dyn NativeRecord) {
        (self.completion)(record)
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Submission half of a transport.
pub trait Transport: Send + Sync {
    /// Hands an outbound call to the transport.
    ///
    /// When `pending` is `Some` and the call is accepted, the transport must
    /// eventually return it through [`TransportEvent::Completed`] exactly once
    /// (or drop it on shutdown).
    ///
    /// # Errors
    ///
    /// Returns a [`SubmissionError`](crate::SubmissionError) if the call cannot
    /// be accepted; `pending` is dropped without running.
    fn submit(&self, request: OutboundRequest, pending: Option<PendingCall>) -> SubmitResult<()>;
}

/// Events reported by a transport driver.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake succeeded.
    Connected,
    /// The connection was lost.
    Disconnected,
    /// An inbound update, in the update record layout.
    Update(RawRecord),
    /// An outbound call finished, with a record in the response layout.
    Completed {
        /// The call to complete.
        pending: PendingCall,
        /// The native response.
        record: RawRecord,
    },
}

/// Driving half of a transport.
#[async_trait]
pub trait TransportDriver: Send {
    /// Runs until `shutdown` is cancelled or `events` is closed.
    async fn run(
        self: Box<Self>,
        events: mpsc::Sender<TransportEvent>,
        shutdown: CancellationToken,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pending_call_completes_with_record() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let pending = PendingCall::new(
            3,
            "sendMessage".into(),
            Box::new(move |record| {
                assert!(record.field("ok").is_some());
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(pending.id(), 3);
        assert_eq!(pending.method(), "sendMessage");

        pending.complete(&RawRecord::new().with("ok", true));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_pending_call_never_completes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let pending = PendingCall::new(
            1,
            "getMe".into(),
            Box::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        drop(pending);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_request_body_json() {
        let request = OutboundRequest::new("sendMessage", r#"{"chat_id":1,"text":"hi"}"#);
        assert_eq!(request.body_json().unwrap()["text"], "hi");
    }
}
