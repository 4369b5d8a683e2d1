//! # Hosted Application
//!
//! [`HostedApplication`] is the one-call way to run a delegate: it builds the
//! [`ApplicationShell`], spawns its [`ApplicationRunner`] on the current tokio
//! runtime, and keeps the [`HostClient`] and the runner's join handle
//! together so shutdown can wait for `quit` to finish.

use crate::clients::HostClient;
use crate::framework::{ApplicationDelegate, ApplicationShell, ShellError};
use crate::lifecycle::config::ShellConfig;
use crate::lifecycle::runner::ApplicationRunner;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running application: its shell, its runner task, and a client to reach it.
///
/// `HostedApplication` is responsible for:
/// - **Startup**: wrapping the delegate in an [`ApplicationShell`] and spawning its [`ApplicationRunner`]
/// - **Access**: handing out [`HostClient`]s
/// - **Shutdown**: closing the request channel and waiting for `quit` to finish
///
/// # Example
///
/// ```ignore
/// let app = HostedApplication::start(AuthenticationApp::new(platform), config, "shell://", "app://auth", args);
///
/// let conn = app.client.connect("app://caller").await?;
/// let endpoint = app.client.connect_to_service(conn, AuthenticationService::NAME).await?;
///
/// app.shutdown().await?;
/// ```
pub struct HostedApplication<D: ApplicationDelegate> {
    /// Client for the application's runner
    pub client: HostClient,

    shell: Arc<ApplicationShell<D>>,
    handle: JoinHandle<Result<(), ShellError>>,
}

impl<D: ApplicationDelegate> HostedApplication<D> {
    /// Spawns the runner for `delegate` on the current tokio runtime.
    ///
    /// `initialize` runs on the runner task before any request is served.
    pub fn start(
        delegate: D,
        config: ShellConfig,
        shell_url: impl Into<String>,
        url: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        let shell = Arc::new(ApplicationShell::new(delegate));
        let (runner, client) = ApplicationRunner::new(shell.clone(), config);
        let handle = tokio::spawn(runner.run(shell_url.into(), args, url.into()));
        Self {
            client,
            shell,
            handle,
        }
    }

    pub fn shell(&self) -> &Arc<ApplicationShell<D>> {
        &self.shell
    }

    /// Shuts the application down.
    ///
    /// Drops this handle's client; the runner stops once every other clone
    /// is gone too, then calls `quit`. Returns the runner's outcome.
    pub async fn shutdown(self) -> Result<(), ShellError> {
        info!("Shutting down application...");
        drop(self.client);

        match self.handle.await {
            Ok(result) => {
                if result.is_ok() {
                    info!("Application shutdown complete.");
                }
                result
            }
            Err(e) => {
                error!("Runner task failed: {:?}", e);
                Err(ShellError::HostDropped)
            }
        }
    }
}
