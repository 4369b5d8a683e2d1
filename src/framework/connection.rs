//! # Connections & Dispatch
//!
//! A connection is one inbound request to use this application's services.
//! It goes through two phases, each with its own type:
//!
//! 1. [`Connection`]: handed to the shell's configuration hook, which fills
//!    its registry via [`add_service`](Connection::add_service).
//! 2. [`ConfiguredConnection`]: what the configuration step returns. Its
//!    registry is frozen and it only knows how to
//!    [`dispatch`](ConfiguredConnection::dispatch) bind requests.
//!
//! Because configuration consumes the `Connection`, a connection cannot be
//! configured twice, and no bind request can reach a registry that is still
//! being populated.

use crate::framework::channel::{Endpoint, EndpointId};
use crate::framework::error::{panic_message, ShellError};
use crate::framework::factory::{ServiceFactory, ServiceInstance};
use crate::framework::registry::{FactoryRegistry, RegistrationConflict};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Host-assigned identifier of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Identity of the peer behind a connection.
///
/// Immutable once the connection exists. The requestor URL is opaque to the
/// framework; services use it for their own authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    id: ConnectionId,
    requestor_url: String,
}

impl ConnectionMetadata {
    pub fn new(id: ConnectionId, requestor_url: impl Into<String>) -> Self {
        Self {
            id,
            requestor_url: requestor_url.into(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn requestor_url(&self) -> &str {
        &self.requestor_url
    }
}

/// A connection that is being configured.
pub struct Connection {
    metadata: Arc<ConnectionMetadata>,
    registry: FactoryRegistry,
}

impl Connection {
    pub fn new(id: ConnectionId, requestor_url: impl Into<String>) -> Self {
        Self {
            metadata: Arc::new(ConnectionMetadata::new(id, requestor_url)),
            registry: FactoryRegistry::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.metadata.id
    }

    pub fn requestor_url(&self) -> &str {
        &self.metadata.requestor_url
    }

    pub fn metadata(&self) -> &Arc<ConnectionMetadata> {
        &self.metadata
    }

    /// Registers `factory` on this connection.
    ///
    /// A duplicate name replaces the earlier factory and is reported back;
    /// see [`FactoryRegistry::register`].
    pub fn add_service(&mut self, factory: impl ServiceFactory) -> Option<RegistrationConflict> {
        self.add_factory(Arc::new(factory))
    }

    /// Like [`add_service`](Self::add_service) for an already shared factory.
    pub fn add_factory(&mut self, factory: Arc<dyn ServiceFactory>) -> Option<RegistrationConflict> {
        self.registry.register(factory)
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Freezes the registry. Called by the shell once the configuration hook
    /// has accepted the connection.
    pub(crate) fn into_configured(self) -> ConfiguredConnection {
        ConfiguredConnection {
            metadata: self.metadata,
            registry: self.registry,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("metadata", &self.metadata)
            .field("registry", &self.registry)
            .finish()
    }
}

/// A peer's request to bind `interface_name` to `endpoint`.
#[derive(Debug)]
pub struct BindRequest {
    pub interface_name: String,
    pub endpoint: Endpoint,
}

impl BindRequest {
    pub fn new(interface_name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            interface_name: interface_name.into(),
            endpoint,
        }
    }
}

/// Outcome of a successful dispatch: the new instance, not yet running.
pub struct BoundService {
    pub interface_name: String,
    pub endpoint_id: EndpointId,
    pub instance: Box<dyn ServiceInstance>,
}

impl fmt::Debug for BoundService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundService")
            .field("interface_name", &self.interface_name)
            .field("endpoint_id", &self.endpoint_id)
            .finish_non_exhaustive()
    }
}

/// A configured connection; its registry is read-only.
///
/// `dispatch` takes `&self`, so one `Arc<ConfiguredConnection>` can serve
/// bind requests from several tasks at once without locking.
pub struct ConfiguredConnection {
    metadata: Arc<ConnectionMetadata>,
    registry: FactoryRegistry,
}

impl ConfiguredConnection {
    pub fn id(&self) -> ConnectionId {
        self.metadata.id
    }

    pub fn metadata(&self) -> &Arc<ConnectionMetadata> {
        &self.metadata
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Resolves the requested interface and binds a new instance to the
    /// request's endpoint.
    ///
    /// On every error path the endpoint has already been closed when this
    /// returns:
    /// - unknown interface: closed here, [`ShellError::UnsupportedInterface`];
    /// - factory returned `Err`: closed when the factory dropped it,
    ///   [`ShellError::ConstructionFailed`];
    /// - factory panicked: closed during unwinding,
    ///   [`ShellError::ConstructionPanicked`].
    ///
    /// Each call is independent: binding the same name twice yields two
    /// unrelated instances.
    pub fn dispatch(&self, request: BindRequest) -> Result<BoundService, ShellError> {
        let BindRequest {
            interface_name,
            endpoint,
        } = request;
        let connection = self.metadata.id;
        let endpoint_id = endpoint.id();

        let Some(factory) = self.registry.resolve(&interface_name) else {
            warn!(%connection, interface = %interface_name, endpoint = %endpoint_id, "Unsupported interface");
            endpoint.close();
            return Err(ShellError::UnsupportedInterface(interface_name));
        };

        debug!(%connection, interface = %interface_name, endpoint = %endpoint_id, "Bind");
        let metadata = &self.metadata;
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
            factory.bind_new_instance(endpoint, metadata)
        }));

        match outcome {
            Ok(Ok(instance)) => Ok(BoundService {
                interface_name,
                endpoint_id,
                instance,
            }),
            Ok(Err(source)) => {
                error!(%connection, interface = %interface_name, error = %source, "Construction failed");
                Err(ShellError::ConstructionFailed {
                    interface: interface_name,
                    source,
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%connection, interface = %interface_name, %message, "Construction panicked");
                Err(ShellError::ConstructionPanicked {
                    interface: interface_name,
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for ConfiguredConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredConnection")
            .field("metadata", &self.metadata)
            .field("registry", &self.registry)
            .finish()
    }
}
