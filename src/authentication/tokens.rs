//! Token cache shared by every authentication service instance of one app.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TokenKey {
    requestor: String,
    username: String,
    scopes: Vec<String>,
}

impl TokenKey {
    fn new(requestor: &str, username: &str, scopes: &[String]) -> Self {
        let mut scopes = scopes.to_vec();
        scopes.sort();
        scopes.dedup();
        Self {
            requestor: requestor.to_string(),
            username: username.to_string(),
            scopes,
        }
    }
}

#[derive(Debug, Default)]
struct TokenStoreInner {
    next_serial: u64,
    tokens: HashMap<TokenKey, String>,
    selections: HashMap<String, String>,
}

/// Issued tokens and last selected accounts, keyed by requestor.
///
/// Tokens are opaque and scoped to the requestor that asked for them: two
/// requestors asking for the same account and scopes get different tokens.
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: Mutex<TokenStoreInner>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token for this key, or a freshly issued one. Scope order
    /// and duplicates do not matter.
    pub fn token_for(&self, requestor: &str, username: &str, scopes: &[String]) -> String {
        let key = TokenKey::new(requestor, username, scopes);
        let mut inner = self.inner.lock();
        if let Some(token) = inner.tokens.get(&key) {
            return token.clone();
        }
        inner.next_serial += 1;
        let token = format!("tok_{:08x}", inner.next_serial);
        inner.tokens.insert(key, token.clone());
        token
    }

    /// Drops `token` if `requestor` owns it. Returns whether anything was removed.
    pub fn clear(&self, requestor: &str, token: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.tokens.len();
        inner
            .tokens
            .retain(|key, issued| !(key.requestor == requestor && issued == token));
        inner.tokens.len() != before
    }

    pub fn remember_selection(&self, requestor: &str, username: &str) {
        self.inner
            .lock()
            .selections
            .insert(requestor.to_string(), username.to_string());
    }

    pub fn last_selection(&self, requestor: &str) -> Option<String> {
        self.inner.lock().selections.get(requestor).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets everything.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock();
        inner.tokens.clear();
        inner.selections.clear();
    }
}
