//! Generic service-hosting framework.
//!
//! This module provides the building blocks an application uses to expose
//! named services over per-connection message pipes.
//!
//! # Main Components
//!
//! - [`Endpoint`] - One end of a message pipe, exclusively owned
//! - [`ServiceFactory`] / [`ServiceInstance`] - Named producers and the services they build
//! - [`FactoryRegistry`] - Per-connection name → factory table with conflict detection
//! - [`Connection`] / [`ConfiguredConnection`] - Configuration phase and dispatch phase
//! - [`ApplicationDelegate`] / [`ApplicationShell`] - Application hooks and the lifecycle state machine
//! - [`ShellError`] - Common error types
//!
//! # Testing
//!
//! See [`mock`] module for scripted factories and a recording delegate.

pub mod channel;
pub mod connection;
pub mod core;
pub mod error;
pub mod factory;
pub mod mock;
pub mod registry;
pub mod shell;

// Re-export core types for convenience
pub use channel::{message_pipe, Endpoint, EndpointId};
pub use connection::{
    BindRequest, BoundService, ConfiguredConnection, Connection, ConnectionId, ConnectionMetadata,
};
pub use self::core::RuntimeHandle;
pub use error::{ChannelError, ProtocolViolation, ServiceError, ShellError};
pub use factory::{factory_fn, FnFactory, Interface, ServiceFactory, ServiceInstance};
pub use registry::{FactoryRegistry, RegistrationConflict};
pub use shell::{ApplicationDelegate, ApplicationShell, ShellContext, ShellState};
