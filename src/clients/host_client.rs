use crate::framework::{ConnectionId, Endpoint, EndpointId, RuntimeHandle, ShellError};
use crate::lifecycle::runner::{ConnectionInfo, HostRequest};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Client for talking to an [`ApplicationRunner`](crate::lifecycle::ApplicationRunner).
///
/// Cheap to clone. The runner keeps going as long as at least one clone is
/// alive.
#[derive(Clone)]
pub struct HostClient {
    sender: mpsc::Sender<HostRequest>,
    runtime: RuntimeHandle,
}

impl HostClient {
    pub fn new(sender: mpsc::Sender<HostRequest>, runtime: RuntimeHandle) -> Self {
        Self { sender, runtime }
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    /// Opens a connection on behalf of `requestor_url`.
    #[instrument(skip(self))]
    pub async fn connect(&self, requestor_url: &str) -> Result<ConnectionId, ShellError> {
        debug!("Sending request");
        let requestor_url = requestor_url.to_string();
        self.request(|respond_to| HostRequest::Connect {
            requestor_url,
            respond_to,
        })
        .await
    }

    /// Asks the application to bind `interface_name` to `endpoint`.
    ///
    /// On failure the endpoint has been closed by the host.
    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint.id()))]
    pub async fn bind(
        &self,
        connection: ConnectionId,
        interface_name: &str,
        endpoint: Endpoint,
    ) -> Result<EndpointId, ShellError> {
        debug!("Sending request");
        let interface_name = interface_name.to_string();
        self.request(|respond_to| HostRequest::Bind {
            connection,
            interface_name,
            endpoint,
            respond_to,
        })
        .await
    }

    /// Creates a pipe, binds one end to `interface_name`, and returns the
    /// other end for the caller to talk through.
    pub async fn connect_to_service(
        &self,
        connection: ConnectionId,
        interface_name: &str,
    ) -> Result<Endpoint, ShellError> {
        let (near, far) = self.runtime.create_message_pipe();
        self.bind(connection, interface_name, far).await?;
        Ok(near)
    }

    /// Tears the connection down, aborting every service bound through it.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), ShellError> {
        debug!("Sending request");
        self.request(|respond_to| HostRequest::Disconnect {
            connection,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn describe(&self, connection: ConnectionId) -> Result<ConnectionInfo, ShellError> {
        self.request(|respond_to| HostRequest::Describe {
            connection,
            respond_to,
        })
        .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, ShellError>>) -> HostRequest,
    ) -> Result<T, ShellError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ShellError::HostClosed)?;
        response.await.map_err(|_| ShellError::HostDropped)?
    }
}
