//! The authentication service instance bound to each endpoint.

use crate::authentication::protocol::{AuthRequest, AuthResponse, ErrorCode};
use crate::authentication::ServiceContext;
use crate::framework::{Endpoint, ServiceInstance};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// One authentication session, serving a single endpoint.
///
/// Requests are answered in order until the peer closes the endpoint. A
/// malformed request gets an [`AuthResponse::Error`] and does not end the
/// session.
pub struct AuthenticationServiceImpl {
    context: ServiceContext,
    endpoint: Endpoint,
}

impl AuthenticationServiceImpl {
    pub fn new(context: ServiceContext, endpoint: Endpoint) -> Self {
        Self { context, endpoint }
    }

    fn handle(&self, request: AuthRequest) -> AuthResponse {
        let requestor = self.context.requestor_url();
        let tokens = self.context.tokens();
        match request {
            AuthRequest::SelectAccount {
                return_last_selected,
            } => {
                let accounts = self.context.platform().accounts();
                let remembered = return_last_selected
                    .then(|| tokens.last_selection(requestor))
                    .flatten()
                    .filter(|name| accounts.contains(name));
                match remembered.or_else(|| accounts.first().cloned()) {
                    Some(username) => {
                        tokens.remember_selection(requestor, &username);
                        AuthResponse::Account { username }
                    }
                    None => AuthResponse::error(ErrorCode::NoAccount, "no account available"),
                }
            }
            AuthRequest::GetOAuth2Token { username, scopes } => {
                if !self.context.platform().has_account(&username) {
                    return AuthResponse::error(
                        ErrorCode::UnknownAccount,
                        format!("unknown account: {username}"),
                    );
                }
                let token = tokens.token_for(requestor, &username, &scopes);
                AuthResponse::Token { token }
            }
            AuthRequest::ClearOAuth2Token { token } => {
                let removed = tokens.clear(requestor, &token);
                debug!(removed, "Token cleared");
                AuthResponse::Cleared
            }
        }
    }
}

#[async_trait]
impl ServiceInstance for AuthenticationServiceImpl {
    async fn serve(mut self: Box<Self>) {
        let requestor = self.context.requestor_url().to_string();
        info!(%requestor, endpoint = %self.endpoint.id(), "Authentication session started");

        while let Some(frame) = self.endpoint.recv().await {
            let response = match serde_json::from_slice::<AuthRequest>(&frame) {
                Ok(request) => {
                    debug!(?request, "Request");
                    self.handle(request)
                }
                Err(e) => {
                    warn!(error = %e, "Malformed request");
                    AuthResponse::error(ErrorCode::BadRequest, format!("malformed request: {e}"))
                }
            };

            let bytes = match serde_json::to_vec(&response) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Failed to encode response");
                    break;
                }
            };
            if self.endpoint.send(bytes).await.is_err() {
                break;
            }
        }

        info!(%requestor, "Authentication session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{PlatformContext, TokenStore};
    use crate::framework::{message_pipe, RuntimeHandle, ShellContext};
    use serde_json::json;
    use std::sync::Arc;

    fn spawn_session(accounts: &[&str]) -> Endpoint {
        let platform = accounts
            .iter()
            .fold(PlatformContext::new("test-device"), |p, a| p.with_account(*a));
        let runtime = RuntimeHandle::new(8);
        let context = ServiceContext {
            platform: Arc::new(platform),
            runtime: runtime.clone(),
            shell: ShellContext::new("shell://test", runtime),
            tokens: Arc::new(TokenStore::new()),
            requestor_url: Arc::from("app://caller"),
        };
        let (near, far) = message_pipe(8);
        let service = Box::new(AuthenticationServiceImpl::new(context, far));
        tokio::spawn(service.serve());
        near
    }

    async fn call(endpoint: &mut Endpoint, request: serde_json::Value) -> AuthResponse {
        endpoint.send(request.to_string()).await.unwrap();
        let frame = endpoint.recv().await.expect("response");
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_select_account_remembers_choice() {
        let mut endpoint = spawn_session(&["alice@example.com", "bob@example.com"]);

        let first = call(
            &mut endpoint,
            json!({"method": "select_account", "return_last_selected": true}),
        )
        .await;
        assert_eq!(
            first,
            AuthResponse::Account {
                username: "alice@example.com".into()
            }
        );

        let again = call(
            &mut endpoint,
            json!({"method": "select_account", "return_last_selected": true}),
        )
        .await;
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_no_accounts() {
        let mut endpoint = spawn_session(&[]);
        let response = call(
            &mut endpoint,
            json!({"method": "select_account", "return_last_selected": false}),
        )
        .await;
        assert!(matches!(
            response,
            AuthResponse::Error {
                code: ErrorCode::NoAccount,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let mut endpoint = spawn_session(&["alice@example.com"]);
        let get = json!({"method": "get_oauth2_token", "username": "alice@example.com", "scopes": ["email"]});

        let AuthResponse::Token { token } = call(&mut endpoint, get.clone()).await else {
            panic!("expected a token");
        };
        assert_eq!(
            call(&mut endpoint, get.clone()).await,
            AuthResponse::Token {
                token: token.clone()
            }
        );

        let cleared = call(
            &mut endpoint,
            json!({"method": "clear_oauth2_token", "token": token.clone()}),
        )
        .await;
        assert_eq!(cleared, AuthResponse::Cleared);

        let AuthResponse::Token { token: fresh } = call(&mut endpoint, get).await else {
            panic!("expected a token");
        };
        assert_ne!(token, fresh);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_session_alive() {
        let mut endpoint = spawn_session(&["alice@example.com"]);

        endpoint.send("not json").await.unwrap();
        let frame = endpoint.recv().await.unwrap();
        let response: AuthResponse = serde_json::from_slice(&frame).unwrap();
        assert!(matches!(
            response,
            AuthResponse::Error {
                code: ErrorCode::BadRequest,
                ..
            }
        ));

        let unknown = call(
            &mut endpoint,
            json!({"method": "get_oauth2_token", "username": "mallory", "scopes": []}),
        )
        .await;
        assert!(matches!(
            unknown,
            AuthResponse::Error {
                code: ErrorCode::UnknownAccount,
                ..
            }
        ));
    }
}
