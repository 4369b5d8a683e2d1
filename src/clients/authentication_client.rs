use crate::authentication::protocol::{AuthRequest, AuthResponse, ErrorCode};
use crate::authentication::{AuthError, AuthenticationService};
use crate::clients::HostClient;
use crate::framework::{ChannelError, ConnectionId, Endpoint, Interface, ShellError};
use tracing::{debug, instrument};

/// Client for the authentication interface.
///
/// Wraps the caller's end of a bound pipe. Requests are strictly
/// request/response, so `&mut self` keeps one call in flight at a time.
pub struct AuthenticationClient {
    endpoint: Endpoint,
}

impl AuthenticationClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Binds a fresh authentication instance on `connection` and wraps it.
    pub async fn connect(host: &HostClient, connection: ConnectionId) -> Result<Self, ShellError> {
        let endpoint = host
            .connect_to_service(connection, AuthenticationService::NAME)
            .await?;
        Ok(Self::new(endpoint))
    }

    #[instrument(skip(self))]
    pub async fn select_account(&mut self, return_last_selected: bool) -> Result<String, AuthError> {
        debug!("Sending request");
        match self
            .call(AuthRequest::SelectAccount {
                return_last_selected,
            })
            .await?
        {
            AuthResponse::Account { username } => Ok(username),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_oauth2_token(
        &mut self,
        username: &str,
        scopes: &[&str],
    ) -> Result<String, AuthError> {
        debug!("Sending request");
        let request = AuthRequest::GetOAuth2Token {
            username: username.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        };
        match self.call(request).await? {
            AuthResponse::Token { token } => Ok(token),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, token))]
    pub async fn clear_oauth2_token(&mut self, token: &str) -> Result<(), AuthError> {
        debug!("Sending request");
        let request = AuthRequest::ClearOAuth2Token {
            token: token.to_string(),
        };
        match self.call(request).await? {
            AuthResponse::Cleared => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Gives the endpoint back, e.g. to close it explicitly.
    pub fn into_endpoint(self) -> Endpoint {
        self.endpoint
    }

    async fn call(&mut self, request: AuthRequest) -> Result<AuthResponse, AuthError> {
        self.endpoint.send(serde_json::to_vec(&request)?).await?;
        let frame = self
            .endpoint
            .recv()
            .await
            .ok_or(AuthError::Channel(ChannelError::PeerClosed))?;
        match serde_json::from_slice(&frame)? {
            AuthResponse::Error { code, message } => Err(match code {
                ErrorCode::NoAccount => AuthError::NoAccount,
                ErrorCode::UnknownAccount => AuthError::UnknownAccount(message),
                ErrorCode::BadRequest => AuthError::Service(message),
            }),
            response => Ok(response),
        }
    }
}

fn unexpected(response: AuthResponse) -> AuthError {
    AuthError::UnexpectedResponse(format!("{response:?}"))
}
