//! Wire messages of the authentication interface.
//!
//! One JSON object per frame. Each request gets exactly one response, in
//! order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthRequest {
    /// Picks the account to authenticate as. With `return_last_selected`,
    /// repeats the caller's previous choice if there was one.
    SelectAccount { return_last_selected: bool },
    /// Issues (or returns the cached) token for `username` and `scopes`.
    #[serde(rename = "get_oauth2_token")]
    GetOAuth2Token { username: String, scopes: Vec<String> },
    /// Forgets `token`; the next request for the same scopes gets a new one.
    #[serde(rename = "clear_oauth2_token")]
    ClearOAuth2Token { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuthResponse {
    Account { username: String },
    Token { token: String },
    Cleared,
    Error { code: ErrorCode, message: String },
}

/// Machine-readable reason carried by [`AuthResponse::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NoAccount,
    UnknownAccount,
    BadRequest,
}

impl AuthResponse {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = AuthRequest::GetOAuth2Token {
            username: "alice".into(),
            scopes: vec!["email".into()],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"method": "get_oauth2_token", "username": "alice", "scopes": ["email"]})
        );

        let parsed: AuthRequest =
            serde_json::from_value(json!({"method": "select_account", "return_last_selected": true}))
                .unwrap();
        assert_eq!(
            parsed,
            AuthRequest::SelectAccount {
                return_last_selected: true
            }
        );
    }

    #[test]
    fn test_error_response_wire_format() {
        let response = AuthResponse::error(ErrorCode::UnknownAccount, "unknown account: bob");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"result": "error", "code": "unknown_account", "message": "unknown account: bob"})
        );
    }
}
