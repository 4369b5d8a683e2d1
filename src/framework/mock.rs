//! # Mock Framework
//!
//! Test doubles for exercising the hosting core without a real application.
//!
//! | Double | Stands in for |
//! |--------|---------------|
//! | [`MockFactory`] | a [`ServiceFactory`] whose bind outcomes are scripted |
//! | [`RecordingDelegate`] | an [`ApplicationDelegate`] that records every hook call |
//! | [`EchoService`] | a trivial [`ServiceInstance`] that echoes frames back |
//!
//! ## Scripting binds
//!
//! Without expectations a `MockFactory` binds an [`EchoService`] every time.
//! Queue expectations to inject faults; they are consumed in order:
//!
//! ```rust
//! use app_shell::framework::mock::MockFactory;
//! use app_shell::framework::{message_pipe, ConnectionId, ConnectionMetadata, ServiceFactory};
//!
//! let factory = MockFactory::new("Auth");
//! factory.expect_bind().return_err("disk full");
//! factory.expect_bind().return_ok();
//!
//! let meta = ConnectionMetadata::new(ConnectionId::from(1), "app://peer");
//! let (e1, peer1) = message_pipe(1);
//! let (e2, _peer2) = message_pipe(1);
//! assert!(factory.bind_new_instance(e1, &meta).is_err());
//! assert!(peer1.is_peer_closed());
//! assert!(factory.bind_new_instance(e2, &meta).is_ok());
//! factory.verify();
//! ```

use crate::framework::channel::Endpoint;
use crate::framework::connection::{Connection, ConnectionId, ConnectionMetadata};
use crate::framework::error::ServiceError;
use crate::framework::factory::{ServiceFactory, ServiceInstance};
use crate::framework::shell::{ApplicationDelegate, ShellContext};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// =============================================================================
// ECHO SERVICE
// =============================================================================

/// Echoes every frame back to the peer until either side closes.
#[derive(Debug)]
pub struct EchoService {
    endpoint: Endpoint,
}

impl EchoService {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl ServiceInstance for EchoService {
    async fn serve(mut self: Box<Self>) {
        while let Some(frame) = self.endpoint.recv().await {
            if self.endpoint.send(frame).await.is_err() {
                break;
            }
        }
    }
}

// =============================================================================
// MOCK FACTORY
// =============================================================================

/// Scripted outcome of one bind call.
enum BindExpectation {
    Ok,
    Err(String),
    Panic(String),
}

#[derive(Default)]
struct MockFactoryState {
    expectations: VecDeque<BindExpectation>,
    bound_requestors: Vec<String>,
    attempts: usize,
}

/// A [`ServiceFactory`] with scripted outcomes and call recording.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the registry holds another.
#[derive(Clone)]
pub struct MockFactory {
    interface_name: String,
    state: Arc<Mutex<MockFactoryState>>,
}

impl MockFactory {
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            state: Arc::new(Mutex::new(MockFactoryState::default())),
        }
    }

    /// A registry-ready handle sharing this mock's state.
    pub fn shared(&self) -> Arc<dyn ServiceFactory> {
        Arc::new(self.clone())
    }

    /// Queues the outcome of the next unscripted bind.
    pub fn expect_bind(&self) -> BindExpectationBuilder {
        BindExpectationBuilder {
            state: self.state.clone(),
        }
    }

    /// Number of successful binds.
    pub fn bind_count(&self) -> usize {
        self.state.lock().bound_requestors.len()
    }

    /// Number of bind calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Requestor URLs seen by successful binds, in call order.
    pub fn bound_requestors(&self) -> Vec<String> {
        self.state.lock().bound_requestors.clone()
    }

    /// Panics if queued expectations were never consumed.
    pub fn verify(&self) {
        let remaining = self.state.lock().expectations.len();
        if remaining != 0 {
            panic!("Not all bind expectations were met. {} remaining", remaining);
        }
    }
}

impl ServiceFactory for MockFactory {
    fn interface_name(&self) -> &str {
        &self.interface_name
    }

    fn bind_new_instance(
        &self,
        endpoint: Endpoint,
        metadata: &ConnectionMetadata,
    ) -> Result<Box<dyn ServiceInstance>, ServiceError> {
        let expectation = {
            let mut state = self.state.lock();
            state.attempts += 1;
            state.expectations.pop_front().unwrap_or(BindExpectation::Ok)
        };

        match expectation {
            BindExpectation::Ok => {
                self.state
                    .lock()
                    .bound_requestors
                    .push(metadata.requestor_url().to_string());
                Ok(Box::new(EchoService::new(endpoint)))
            }
            BindExpectation::Err(message) => {
                drop(endpoint);
                Err(message.into())
            }
            // Unwinds with `endpoint` still owned by this frame.
            BindExpectation::Panic(message) => panic!("{}", message),
        }
    }
}

/// Builder for bind expectations.
pub struct BindExpectationBuilder {
    state: Arc<Mutex<MockFactoryState>>,
}

impl BindExpectationBuilder {
    /// The bind succeeds with an [`EchoService`].
    pub fn return_ok(self) {
        self.push(BindExpectation::Ok);
    }

    /// The bind fails with `message`.
    pub fn return_err(self, message: impl Into<String>) {
        self.push(BindExpectation::Err(message.into()));
    }

    /// The bind panics with `message`.
    pub fn panic(self, message: impl Into<String>) {
        self.push(BindExpectation::Panic(message.into()));
    }

    fn push(self, expectation: BindExpectation) {
        self.state.lock().expectations.push_back(expectation);
    }
}

// =============================================================================
// RECORDING DELEGATE
// =============================================================================

#[derive(Default)]
struct DelegateLog {
    initialized_with: Option<(String, usize)>,
    configured: Vec<ConnectionId>,
    quit_calls: usize,
}

/// An [`ApplicationDelegate`] that registers [`MockFactory`]s and records
/// every hook call.
pub struct RecordingDelegate {
    interfaces: Vec<MockFactory>,
    accept: bool,
    fail_initialize: Option<String>,
    log: Mutex<DelegateLog>,
}

impl RecordingDelegate {
    /// Accepts every connection, registering one fresh [`MockFactory`] per
    /// name on each.
    pub fn serving(interfaces: &[&str]) -> Self {
        Self {
            interfaces: interfaces.iter().map(|name| MockFactory::new(*name)).collect(),
            accept: true,
            fail_initialize: None,
            log: Mutex::new(DelegateLog::default()),
        }
    }

    /// Rejects every connection.
    pub fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::serving(&[])
        }
    }

    /// Fails `initialize` with `message`.
    pub fn failing_initialize(message: impl Into<String>) -> Self {
        Self {
            fail_initialize: Some(message.into()),
            ..Self::serving(&[])
        }
    }

    /// The factory registered for `interface_name`, to script or inspect it.
    /// Every connection shares the same mock.
    pub fn factory(&self, interface_name: &str) -> Option<MockFactory> {
        self.interfaces
            .iter()
            .find(|f| f.interface_name == interface_name)
            .cloned()
    }

    /// `(url, number of args)` passed to `initialize`, if it ran.
    pub fn initialized_with(&self) -> Option<(String, usize)> {
        self.log.lock().initialized_with.clone()
    }

    pub fn configured_connections(&self) -> Vec<ConnectionId> {
        self.log.lock().configured.clone()
    }

    pub fn quit_calls(&self) -> usize {
        self.log.lock().quit_calls
    }
}

impl ApplicationDelegate for RecordingDelegate {
    fn initialize(
        &mut self,
        _shell: ShellContext,
        args: &[String],
        url: &str,
    ) -> Result<(), ServiceError> {
        if let Some(message) = &self.fail_initialize {
            return Err(message.clone().into());
        }
        self.log.lock().initialized_with = Some((url.to_string(), args.len()));
        Ok(())
    }

    fn configure_incoming_connection(&self, connection: &mut Connection) -> bool {
        self.log.lock().configured.push(connection.id());
        if !self.accept {
            return false;
        }
        for factory in &self.interfaces {
            connection.add_factory(factory.shared());
        }
        true
    }

    fn quit(&mut self) -> Result<(), ServiceError> {
        self.log.lock().quit_calls += 1;
        Ok(())
    }
}
