//! # Runtime Handle
//!
//! [`RuntimeHandle`] is the process-wide handle to the messaging runtime.
//! It is cheap to clone and is what factories capture when the services they
//! build need to open pipes of their own.

use crate::framework::channel::{message_pipe, Endpoint};
use crate::framework::connection::ConnectionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct RuntimeInner {
    channel_capacity: usize,
    next_connection_id: AtomicU64,
}

/// Shared handle to the messaging runtime.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    inner: Arc<RuntimeInner>,
}

impl RuntimeHandle {
    /// `channel_capacity` is the per-direction queue bound of every pipe this
    /// runtime creates. Zero is bumped to one, since tokio rejects empty queues.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                channel_capacity: channel_capacity.max(1),
                next_connection_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.inner.channel_capacity
    }

    pub fn create_message_pipe(&self) -> (Endpoint, Endpoint) {
        message_pipe(self.inner.channel_capacity)
    }

    /// Allocates a fresh connection id. Ids start at 1 and are never reused.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::from(self.inner.next_connection_id.fetch_add(1, Ordering::SeqCst))
    }
}
