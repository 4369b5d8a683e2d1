//! # Hosting Lifecycle
//!
//! This module is the host runtime side of the framework: it runs an
//! application, feeds it connections and bind requests, and shuts it down.
//!
//! ## The Runner Pattern
//!
//! [`ApplicationRunner`] is an actor. It owns the [`ApplicationShell`](crate::framework::ApplicationShell)
//! and a request queue; [`HostClient`](crate::clients::HostClient)s put
//! requests on the queue and wait for a one-shot reply.
//!
//! ```rust,ignore
//! let shell = Arc::new(ApplicationShell::new(delegate));
//! let (runner, client) = ApplicationRunner::new(shell, ShellConfig::default());
//! tokio::spawn(runner.run(shell_url, args, url));
//!
//! let conn = client.connect("app://caller").await?;
//! let endpoint = client.connect_to_service(conn, "example.Service").await?;
//! ```
//!
//! [`HostedApplication`] bundles those steps, like a small orchestrator.
//!
//! ## Graceful Shutdown
//!
//! 1. **Drop all clients** - closes the request queue
//! 2. **Runner leaves its loop** - `recv()` returns `None`
//! 3. **Shell quits** - the delegate's `quit` runs, after every configuration call
//! 4. **Services close** - unless [`ShellConfig::close_services_on_quit`] is off
//!
//! ## Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging; see the [`tracing`](self::tracing)
//! module for what is logged at which level.

pub mod config;
pub mod host;
pub mod runner;
pub mod tracing;

pub use config::*;
pub use host::*;
pub use runner::*;
pub use self::tracing::*;
