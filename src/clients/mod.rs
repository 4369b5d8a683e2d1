//! Typed clients: one for the host, one per hosted interface.

pub mod authentication_client;
pub mod host_client;

pub use authentication_client::*;
pub use host_client::*;
