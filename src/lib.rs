//! # App Shell
//!
//! > **A small host for applications that serve named interfaces over message pipes.**
//!
//! An application plugs into the host through one trait,
//! [`ApplicationDelegate`](framework::ApplicationDelegate). The host drives it
//! through a fixed lifecycle and, for every inbound connection, lets it decide
//! which interfaces that connection may bind.
//!
//! ## 🏗️ Design Philosophy
//!
//! - **Ownership instead of bookkeeping**: an [`Endpoint`](framework::Endpoint) has one owner
//!   and binding consumes it, so double binds do not compile.
//! - **Phases as types**: a [`Connection`](framework::Connection) is configured once and turns
//!   into a [`ConfiguredConnection`](framework::ConfiguredConnection) that can only dispatch.
//! - **A per-app actor**: the [`ApplicationRunner`](lifecycle::ApplicationRunner) owns all
//!   connections and processes host requests sequentially, while bound services run
//!   on their own tasks.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Pipes, factories, the per-connection registry, dispatch, and the lifecycle state machine.
//! - **Key items**: [`ServiceFactory`](framework::ServiceFactory),
//!   [`ApplicationShell`](framework::ApplicationShell).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! Runs one application: its request loop, configuration, and tracing setup.
//! - **Key items**: [`HostedApplication`](lifecycle::HostedApplication),
//!   [`ShellConfig`](lifecycle::ShellConfig).
//!
//! ### 3. The Interface ([`clients`])
//! Typed wrappers over raw requests and frames.
//! - **Key items**: [`HostClient`](clients::HostClient),
//!   [`AuthenticationClient`](clients::AuthenticationClient).
//!
//! ### 4. The Application ([`authentication`])
//! A complete hosted application built on the framework.
//!
//! ## 🧪 Testing
//!
//! See [`framework::mock`] for scripted factories and a recording delegate.

pub mod authentication;
pub mod clients;
pub mod framework;
pub mod lifecycle;
