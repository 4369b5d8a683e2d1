//! # Application Runner
//!
//! [`ApplicationRunner`] plays the host runtime for one application. It owns
//! the [`ApplicationShell`], accepts requests from any number of
//! [`HostClient`]s, and drives the shell's lifecycle:
//!
//! 1. `run` calls `initialize` before it reads its first request.
//! 2. Each `Connect` request builds a [`Connection`] and has the shell
//!    configure it; accepted connections are kept by id.
//! 3. Each `Bind` request is dispatched against the named connection; the
//!    resulting instance is spawned on its own task and tracked under that
//!    connection.
//! 4. When the last client is dropped the loop ends and `run` calls `quit`.
//!
//! Requests are processed one at a time, so every configuration call
//! completes before any bind for that connection is looked at, and before
//! `quit`.

use crate::clients::HostClient;
use crate::framework::{
    ApplicationDelegate, ApplicationShell, BindRequest, ConfiguredConnection, Connection,
    ConnectionId, Endpoint, EndpointId, ProtocolViolation, RegistrationConflict, RuntimeHandle,
    ShellContext, ShellError,
};
use crate::lifecycle::config::ShellConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Type alias for the one-shot response channel used by the host.
pub type Response<T> = oneshot::Sender<Result<T, ShellError>>;

/// Snapshot of a configured connection, for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub requestor_url: String,
    /// Registered interface names, in registration order.
    pub interfaces: Vec<String>,
    pub conflicts: Vec<RegistrationConflict>,
    /// Service instances bound through this connection that are still running.
    pub live_services: usize,
}

/// Requests a [`HostClient`] sends to the runner.
#[derive(Debug)]
pub enum HostRequest {
    Connect {
        requestor_url: String,
        respond_to: Response<ConnectionId>,
    },
    Bind {
        connection: ConnectionId,
        interface_name: String,
        endpoint: Endpoint,
        respond_to: Response<EndpointId>,
    },
    Disconnect {
        connection: ConnectionId,
        respond_to: Response<()>,
    },
    Describe {
        connection: ConnectionId,
        respond_to: Response<ConnectionInfo>,
    },
}

struct LiveConnection {
    connection: Arc<ConfiguredConnection>,
    services: Vec<JoinHandle<()>>,
}

impl LiveConnection {
    fn prune_finished(&mut self) {
        self.services.retain(|handle| !handle.is_finished());
    }

    fn close(self) {
        for handle in &self.services {
            handle.abort();
        }
    }
}

/// Host-side event loop for one application.
pub struct ApplicationRunner<D: ApplicationDelegate> {
    receiver: mpsc::Receiver<HostRequest>,
    shell: Arc<ApplicationShell<D>>,
    runtime: RuntimeHandle,
    config: ShellConfig,
    connections: HashMap<ConnectionId, LiveConnection>,
}

impl<D: ApplicationDelegate> ApplicationRunner<D> {
    /// Creates the runner and the client used to reach it.
    pub fn new(shell: Arc<ApplicationShell<D>>, config: ShellConfig) -> (Self, HostClient) {
        let (sender, receiver) = mpsc::channel(config.host_queue_capacity.max(1));
        let runtime = RuntimeHandle::new(config.channel_capacity);
        let client = HostClient::new(sender, runtime.clone());
        let runner = Self {
            receiver,
            shell,
            runtime,
            config,
            connections: HashMap::new(),
        };
        (runner, client)
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    /// Runs the application until every client is gone.
    ///
    /// Fails if the shell cannot be initialized or cannot quit cleanly; both
    /// mean the hosting environment itself is broken.
    pub async fn run(mut self, shell_url: String, args: Vec<String>, url: String) -> Result<(), ShellError> {
        info!(%url, "Host started");
        let context = ShellContext::new(shell_url, self.runtime.clone());
        if let Err(e) = self.shell.initialize(context, &args, &url) {
            error!(error = %e, "Shell initialization failed");
            return Err(e);
        }

        while let Some(request) = self.receiver.recv().await {
            match request {
                HostRequest::Connect {
                    requestor_url,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.connect(requestor_url));
                }
                HostRequest::Bind {
                    connection,
                    interface_name,
                    endpoint,
                    respond_to,
                } => {
                    let result = self.bind(connection, BindRequest::new(interface_name, endpoint));
                    let _ = respond_to.send(result);
                }
                HostRequest::Disconnect {
                    connection,
                    respond_to,
                } => {
                    let result = match self.connections.remove(&connection) {
                        Some(live) => {
                            info!(%connection, services = live.services.len(), "Connection closed");
                            live.close();
                            Ok(())
                        }
                        None => Err(ProtocolViolation::UnknownConnection(connection).into()),
                    };
                    let _ = respond_to.send(result);
                }
                HostRequest::Describe {
                    connection,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.describe(connection));
                }
            }
        }

        self.shutdown()
    }

    fn connect(&mut self, requestor_url: String) -> Result<ConnectionId, ShellError> {
        let id = self.runtime.next_connection_id();
        let connection = Connection::new(id, requestor_url.clone());
        match self.shell.configure_incoming_connection(connection)? {
            Some(configured) => {
                self.connections.insert(
                    id,
                    LiveConnection {
                        connection: Arc::new(configured),
                        services: Vec::new(),
                    },
                );
                Ok(id)
            }
            None => Err(ShellError::ConnectionRejected(requestor_url)),
        }
    }

    fn bind(&mut self, id: ConnectionId, request: BindRequest) -> Result<EndpointId, ShellError> {
        let Some(live) = self.connections.get_mut(&id) else {
            warn!(connection = %id, interface = %request.interface_name, "Bind on unknown connection");
            return Err(ProtocolViolation::UnknownConnection(id).into());
        };

        // Dispatch failures are local to this bind; the connection stays up.
        let bound = live.connection.dispatch(request)?;
        live.prune_finished();
        live.services.push(tokio::spawn(bound.instance.serve()));
        debug!(connection = %id, interface = %bound.interface_name, live = live.services.len(), "Service running");
        Ok(bound.endpoint_id)
    }

    fn describe(&mut self, id: ConnectionId) -> Result<ConnectionInfo, ShellError> {
        let live = self
            .connections
            .get_mut(&id)
            .ok_or(ProtocolViolation::UnknownConnection(id))?;
        live.prune_finished();
        let registry = live.connection.registry();
        Ok(ConnectionInfo {
            id,
            requestor_url: live.connection.metadata().requestor_url().to_string(),
            interfaces: registry.interface_names().map(str::to_string).collect(),
            conflicts: registry.conflicts().to_vec(),
            live_services: live.services.len(),
        })
    }

    fn shutdown(&mut self) -> Result<(), ShellError> {
        info!(connections = self.connections.len(), "Host stopping");
        let result = self.shell.quit();
        if let Err(e) = &result {
            error!(error = %e, "Shell quit failed");
        }

        let close = self.config.close_services_on_quit;
        for (id, live) in self.connections.drain() {
            if close {
                debug!(connection = %id, services = live.services.len(), "Closing services");
                live.close();
            }
        }
        info!("Host stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::RecordingDelegate;
    use crate::framework::ShellState;
    use bytes::Bytes;

    fn start(
        delegate: RecordingDelegate,
        config: ShellConfig,
    ) -> (
        Arc<ApplicationShell<RecordingDelegate>>,
        JoinHandle<Result<(), ShellError>>,
        HostClient,
    ) {
        let shell = Arc::new(ApplicationShell::new(delegate));
        let (runner, client) = ApplicationRunner::new(shell.clone(), config);
        let handle = tokio::spawn(runner.run(
            "shell://test".into(),
            Vec::new(),
            "app://under-test".into(),
        ));
        (shell, handle, client)
    }

    #[tokio::test]
    async fn test_connect_bind_and_shutdown() {
        let (shell, handle, client) = start(RecordingDelegate::serving(&["Echo"]), ShellConfig::default());

        let conn = client.connect("app://peer").await.unwrap();
        let mut endpoint = client.connect_to_service(conn, "Echo").await.unwrap();
        endpoint.send("hi").await.unwrap();
        assert_eq!(endpoint.recv().await.unwrap(), Bytes::from("hi"));

        let info = client.describe(conn).await.unwrap();
        assert_eq!(info.interfaces, vec!["Echo".to_string()]);
        assert_eq!(info.live_services, 1);

        drop(client);
        handle.await.unwrap().unwrap();
        assert_eq!(shell.state(), ShellState::Terminated);
        // The instance was aborted on quit, so its endpoint is closed.
        assert!(endpoint.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_bind_on_unknown_connection_is_violation() {
        let (_shell, handle, client) = start(RecordingDelegate::serving(&["Echo"]), ShellConfig::default());

        let err = client
            .connect_to_service(ConnectionId::from(99), "Echo")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShellError::Protocol(ProtocolViolation::UnknownConnection(id)) if id == ConnectionId::from(99)
        ));

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_services_survive_quit_when_configured() {
        let config = ShellConfig {
            close_services_on_quit: false,
            ..ShellConfig::default()
        };
        let (_shell, handle, client) = start(RecordingDelegate::serving(&["Echo"]), config);

        let conn = client.connect("app://peer").await.unwrap();
        let mut endpoint = client.connect_to_service(conn, "Echo").await.unwrap();
        drop(client);
        handle.await.unwrap().unwrap();

        endpoint.send("still there?").await.unwrap();
        assert_eq!(endpoint.recv().await.unwrap(), Bytes::from("still there?"));
    }

    #[tokio::test]
    async fn test_initialize_failure_stops_host() {
        let (_shell, handle, client) = start(
            RecordingDelegate::failing_initialize("no platform"),
            ShellConfig::default(),
        );
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ShellError::Lifecycle { phase: "initialize", .. })));

        let err = client.connect("app://peer").await.unwrap_err();
        assert!(matches!(err, ShellError::HostClosed | ShellError::HostDropped));
    }
}
