//! # Authentication Application
//!
//! A hosted application exposing one interface,
//! [`AuthenticationService`], on every connection it accepts.
//!
//! ## Structure
//!
//! - [`AuthenticationApp`] - the [`ApplicationDelegate`]: keeps the shell context, registers the factory per connection
//! - [`AuthenticationFactory`] - binds an [`AuthenticationServiceImpl`] to each requested endpoint
//! - [`ServiceContext`] - what every instance built for one connection shares
//! - [`protocol`] - request/response messages
//! - [`error`] - [`AuthError`]
//!
//! ## Usage
//!
//! ```rust
//! use app_shell::authentication::{AuthenticationApp, PlatformContext};
//! use app_shell::clients::AuthenticationClient;
//! use app_shell::lifecycle::{HostedApplication, ShellConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let platform = PlatformContext::new("demo-device").with_account("alice@example.com");
//!     let app = HostedApplication::start(
//!         AuthenticationApp::new(platform),
//!         ShellConfig::default(),
//!         "shell://demo",
//!         "app://authentication",
//!         Vec::new(),
//!     );
//!
//!     let conn = app.client.connect("app://caller").await?;
//!     let mut auth = AuthenticationClient::connect(&app.client, conn).await?;
//!     let account = auth.select_account(false).await?;
//!     assert_eq!(account, "alice@example.com");
//!
//!     drop(auth);
//!     app.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod service;
pub mod tokens;

pub use error::*;
pub use service::AuthenticationServiceImpl;
pub use tokens::TokenStore;

use crate::framework::{
    ApplicationDelegate, Connection, ConnectionMetadata, Endpoint, Interface, RuntimeHandle,
    ServiceError, ServiceFactory, ServiceInstance, ShellContext,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Marker for the authentication interface.
pub struct AuthenticationService;

impl Interface for AuthenticationService {
    const NAME: &'static str = "authentication.AuthenticationService";
}

/// Platform resources the service draws on: the device and its accounts.
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    device_name: String,
    accounts: Vec<String>,
}

impl PlatformContext {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            accounts: Vec::new(),
        }
    }

    pub fn with_account(mut self, username: impl Into<String>) -> Self {
        self.accounts.push(username.into());
        self
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn has_account(&self, username: &str) -> bool {
        self.accounts.iter().any(|a| a == username)
    }
}

/// Everything an authentication instance needs, captured once per connection.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    platform: Arc<PlatformContext>,
    runtime: RuntimeHandle,
    shell: ShellContext,
    tokens: Arc<TokenStore>,
    requestor_url: Arc<str>,
}

impl ServiceContext {
    pub fn platform(&self) -> &PlatformContext {
        &self.platform
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    pub fn shell(&self) -> &ShellContext {
        &self.shell
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn requestor_url(&self) -> &str {
        &self.requestor_url
    }
}

/// Builds [`AuthenticationServiceImpl`]s for one connection.
#[derive(Debug)]
pub struct AuthenticationFactory {
    context: ServiceContext,
}

impl AuthenticationFactory {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }
}

impl ServiceFactory for AuthenticationFactory {
    fn interface_name(&self) -> &str {
        AuthenticationService::NAME
    }

    fn bind_new_instance(
        &self,
        endpoint: Endpoint,
        _metadata: &ConnectionMetadata,
    ) -> Result<Box<dyn ServiceInstance>, ServiceError> {
        Ok(Box::new(AuthenticationServiceImpl::new(
            self.context.clone(),
            endpoint,
        )))
    }
}

/// The authentication application delegate.
pub struct AuthenticationApp {
    platform: Arc<PlatformContext>,
    tokens: Arc<TokenStore>,
    shell: Option<ShellContext>,
}

impl AuthenticationApp {
    pub fn new(platform: PlatformContext) -> Self {
        Self {
            platform: Arc::new(platform),
            tokens: Arc::new(TokenStore::new()),
            shell: None,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }
}

impl ApplicationDelegate for AuthenticationApp {
    fn initialize(
        &mut self,
        shell: ShellContext,
        _args: &[String],
        url: &str,
    ) -> Result<(), ServiceError> {
        info!(url, device = self.platform.device_name(), "Authentication app initialized");
        self.shell = Some(shell);
        Ok(())
    }

    fn configure_incoming_connection(&self, connection: &mut Connection) -> bool {
        // The shell only calls us after initialize.
        let Some(shell) = &self.shell else {
            return false;
        };
        if connection.requestor_url().is_empty() {
            warn!(connection = %connection.id(), "Refusing anonymous requestor");
            return false;
        }

        let context = ServiceContext {
            platform: self.platform.clone(),
            runtime: shell.runtime().clone(),
            shell: shell.clone(),
            tokens: self.tokens.clone(),
            requestor_url: Arc::from(connection.requestor_url()),
        };
        connection.add_service(AuthenticationFactory::new(context));
        true
    }

    fn quit(&mut self) -> Result<(), ServiceError> {
        info!(tokens = self.tokens.len(), "Authentication app quitting");
        self.tokens.clear_all();
        self.shell = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{message_pipe, ApplicationShell, ConnectionId};

    fn initialized_shell() -> ApplicationShell<AuthenticationApp> {
        let platform = PlatformContext::new("test-device").with_account("alice@example.com");
        let shell = ApplicationShell::new(AuthenticationApp::new(platform));
        shell
            .initialize(
                ShellContext::new("shell://test", RuntimeHandle::new(4)),
                &[],
                "app://authentication",
            )
            .unwrap();
        shell
    }

    #[test]
    fn test_registers_single_authentication_factory() {
        let shell = initialized_shell();
        let configured = shell
            .configure_incoming_connection(Connection::new(ConnectionId::from(1), "app://caller"))
            .unwrap()
            .expect("accepted");

        let names: Vec<_> = configured.registry().interface_names().collect();
        assert_eq!(names, vec![AuthenticationService::NAME]);
        assert!(!configured.registry().has_conflicts());
    }

    #[tokio::test]
    async fn test_factory_binds_without_checking_metadata() {
        let shell = initialized_shell();
        let configured = shell
            .configure_incoming_connection(Connection::new(ConnectionId::from(1), "app://caller"))
            .unwrap()
            .expect("accepted");
        let factory = configured
            .registry()
            .resolve(AuthenticationService::NAME)
            .expect("registered");

        // The requestor is captured at configuration time; whatever metadata
        // arrives with the bind is not consulted.
        let (endpoint, peer) = message_pipe(4);
        let other = ConnectionMetadata::new(ConnectionId::from(2), "app://someone-else");
        let instance = factory.bind_new_instance(endpoint, &other).unwrap();
        assert!(!peer.is_peer_closed());
        drop(instance);
        assert!(peer.is_peer_closed());
    }

    #[test]
    fn test_rejects_anonymous_requestor() {
        let shell = initialized_shell();
        let outcome = shell
            .configure_incoming_connection(Connection::new(ConnectionId::from(1), ""))
            .unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_quit_clears_tokens() {
        let shell = initialized_shell();
        let tokens = shell.with_delegate(|app| app.tokens().clone());
        tokens.token_for("app://caller", "alice@example.com", &[]);
        assert_eq!(tokens.len(), 1);

        shell.quit().unwrap();
        assert!(tokens.is_empty());
    }
}
