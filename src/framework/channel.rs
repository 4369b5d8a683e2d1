//! # Message Pipes
//!
//! An [`Endpoint`] is one end of a bidirectional, in-process message pipe.
//! Pipes are created in pairs; whatever holds an endpoint owns it exclusively
//! and passes it on by value.
//!
//! ## Ownership Rules
//!
//! - `Endpoint` is not `Clone`. There is exactly one owner at a time.
//! - Dropping an endpoint closes it. The peer sees `recv()` return `None`
//!   and further `send`s fail with [`ChannelError::PeerClosed`].
//! - Binding consumes the endpoint, so an endpoint can be bound at most once.
//!   Trying to bind it again is rejected by the borrow checker.

use crate::framework::error::ChannelError;
use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    fn next() -> Self {
        Self(NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep_{}", self.0)
    }
}

/// Creates a connected pair of endpoints.
///
/// `capacity` bounds the number of in-flight frames in each direction. A
/// sender waits while the peer's queue is full. Zero is treated as one.
pub fn message_pipe(capacity: usize) -> (Endpoint, Endpoint) {
    let capacity = capacity.max(1);
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    let a = Endpoint::new(a_tx, a_rx);
    let b = Endpoint::new(b_tx, b_rx);
    trace!(a = %a.id, b = %b.id, capacity, "Pipe created");
    (a, b)
}

/// One end of a message pipe.
pub struct Endpoint {
    id: EndpointId,
    sender: mpsc::Sender<Bytes>,
    receiver: mpsc::Receiver<Bytes>,
}

impl Endpoint {
    fn new(sender: mpsc::Sender<Bytes>, receiver: mpsc::Receiver<Bytes>) -> Self {
        Self {
            id: EndpointId::next(),
            sender,
            receiver,
        }
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Sends one frame to the peer.
    pub async fn send(&self, frame: impl Into<Bytes>) -> Result<(), ChannelError> {
        self.sender
            .send(frame.into())
            .await
            .map_err(|_| ChannelError::PeerClosed)
    }

    /// Receives the next frame, or `None` once the peer has closed and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Whether the peer has gone away. Frames already queued for us may
    /// still be readable.
    pub fn is_peer_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Closes this endpoint. Equivalent to dropping it.
    pub fn close(self) {}
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("id", &self.id).finish()
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        trace!(endpoint = %self.id, "Endpoint closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (mut a, mut b) = message_pipe(4);
        a.send("ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Bytes::from("ping"));
        b.send("pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap(), Bytes::from("pong"));
    }

    #[tokio::test]
    async fn test_close_is_observed_by_peer() {
        let (a, mut b) = message_pipe(4);
        assert!(!b.is_peer_closed());
        a.close();
        assert!(b.is_peer_closed());
        assert!(b.recv().await.is_none());
        assert_eq!(b.send("late").await, Err(ChannelError::PeerClosed));
    }

    #[tokio::test]
    async fn test_queued_frames_survive_sender_close() {
        let (a, mut b) = message_pipe(4);
        a.send("last words").await.unwrap();
        drop(a);
        assert_eq!(b.recv().await.unwrap(), Bytes::from("last words"));
        assert!(b.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_capacity_pipe_still_carries_frames() {
        let (a, mut b) = message_pipe(0);
        a.send("one").await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Bytes::from("one"));
    }

    #[test]
    fn test_endpoint_ids_are_unique() {
        let (a, b) = message_pipe(1);
        let (c, d) = message_pipe(1);
        let mut ids = vec![a.id(), b.id(), c.id(), d.id()];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
