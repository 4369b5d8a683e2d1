//! # Service Factories
//!
//! A [`ServiceFactory`] is a named producer: given an [`Endpoint`] and the
//! metadata of the connection asking for it, it builds a [`ServiceInstance`]
//! that owns the endpoint from then on.
//!
//! Factories are registered per connection (see
//! [`Connection::add_service`](crate::framework::Connection::add_service)) and
//! are shared read-only afterwards, so they must be `Send + Sync` and must not
//! mutate themselves when binding.
//!
//! ```rust
//! use app_shell::framework::{factory_fn, message_pipe, ServiceFactory, ServiceInstance};
//! use app_shell::framework::{ConnectionId, ConnectionMetadata, Endpoint};
//! use async_trait::async_trait;
//!
//! struct Sink(Endpoint);
//!
//! #[async_trait]
//! impl ServiceInstance for Sink {
//!     async fn serve(mut self: Box<Self>) {
//!         while self.0.recv().await.is_some() {}
//!     }
//! }
//!
//! let factory = factory_fn("example.Sink", |endpoint, _meta| {
//!     Ok(Box::new(Sink(endpoint)) as Box<dyn ServiceInstance>)
//! });
//! assert_eq!(factory.interface_name(), "example.Sink");
//!
//! let (near, _far) = message_pipe(4);
//! let meta = ConnectionMetadata::new(ConnectionId::from(1), "app://caller");
//! assert!(factory.bind_new_instance(near, &meta).is_ok());
//! ```

use crate::framework::channel::Endpoint;
use crate::framework::connection::ConnectionMetadata;
use crate::framework::error::ServiceError;
use async_trait::async_trait;
use std::fmt;

/// A live service bound to exactly one endpoint.
///
/// The instance owns its endpoint. `serve` drives the protocol until the
/// endpoint closes; the host runs it on its own task and aborts that task
/// when the owning connection is torn down.
#[async_trait]
pub trait ServiceInstance: Send + 'static {
    async fn serve(self: Box<Self>);
}

/// A service contract with a globally meaningful name.
///
/// Implemented by marker types so factories and clients can agree on the
/// name without repeating string literals.
pub trait Interface {
    const NAME: &'static str;
}

/// Builds service instances for one named interface.
pub trait ServiceFactory: Send + Sync + 'static {
    /// The interface this factory serves. Must not change over the factory's lifetime.
    fn interface_name(&self) -> &str;

    /// Constructs a new instance and hands `endpoint` over to it.
    ///
    /// The endpoint is moved in. If construction fails, returning `Err` (or
    /// unwinding) drops it, which closes it; there is no state in which the
    /// endpoint is half owned.
    fn bind_new_instance(
        &self,
        endpoint: Endpoint,
        metadata: &ConnectionMetadata,
    ) -> Result<Box<dyn ServiceInstance>, ServiceError>;
}

/// A [`ServiceFactory`] built from a closure.
pub struct FnFactory<F> {
    interface_name: String,
    bind: F,
}

impl<F> FnFactory<F>
where
    F: Fn(Endpoint, &ConnectionMetadata) -> Result<Box<dyn ServiceInstance>, ServiceError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(interface_name: impl Into<String>, bind: F) -> Self {
        Self {
            interface_name: interface_name.into(),
            bind,
        }
    }
}

impl<F> ServiceFactory for FnFactory<F>
where
    F: Fn(Endpoint, &ConnectionMetadata) -> Result<Box<dyn ServiceInstance>, ServiceError>
        + Send
        + Sync
        + 'static,
{
    fn interface_name(&self) -> &str {
        &self.interface_name
    }

    fn bind_new_instance(
        &self,
        endpoint: Endpoint,
        metadata: &ConnectionMetadata,
    ) -> Result<Box<dyn ServiceInstance>, ServiceError> {
        (self.bind)(endpoint, metadata)
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory")
            .field("interface_name", &self.interface_name)
            .finish()
    }
}

/// Shorthand for [`FnFactory::new`].
pub fn factory_fn<F>(interface_name: impl Into<String>, bind: F) -> FnFactory<F>
where
    F: Fn(Endpoint, &ConnectionMetadata) -> Result<Box<dyn ServiceInstance>, ServiceError>
        + Send
        + Sync
        + 'static,
{
    FnFactory::new(interface_name, bind)
}
