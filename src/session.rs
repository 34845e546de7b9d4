//! Shopper session

use std::sync::Arc;

use tracing::warn;

use crate::storage::{KeyValueStore, StorageError};

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Authentication state the cart engine consults.
pub trait Session: Send + Sync {
    /// Current bearer token, if signed in.
    fn token(&self) -> Option<String>;

    /// Whether the shopper is signed in.
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Drop the session after the API rejected its token.
    fn invalidate(&self);
}

/// Session whose token lives in the local key-value store.
#[derive(Debug, Clone)]
pub struct StoredSession {
    store: Arc<dyn KeyValueStore>,
}

impl StoredSession {
    /// Read the session from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store a token handed over by the sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the token cannot be written.
    pub fn remember(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token.trim())
    }
}

impl Session for StoredSession {
    fn token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(error) => {
                warn!(%error, "failed to read session token");
                None
            }
        }
    }

    fn invalidate(&self) {
        if let Err(error) = self.store.remove(TOKEN_KEY) {
            warn!(%error, "failed to clear session token");
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::storage::MemoryStore;

    use super::*;

    #[test]
    fn token_is_read_from_store() -> TestResult {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = StoredSession::new(Arc::clone(&store));

        assert!(!session.is_authenticated(), "empty store has no session");

        session.remember(" abc ")?;

        assert_eq!(session.token().as_deref(), Some("abc"));
        assert!(session.is_authenticated(), "stored token authenticates");

        Ok(())
    }

    #[test]
    fn blank_token_is_not_a_session() -> TestResult {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "   ")?;

        assert!(!StoredSession::new(store).is_authenticated(), "blank token rejected");

        Ok(())
    }

    #[test]
    fn invalidate_clears_token() -> TestResult {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = StoredSession::new(Arc::clone(&store));
        session.remember("abc")?;

        session.invalidate();

        assert_eq!(store.get(TOKEN_KEY)?, None);
        assert!(!session.is_authenticated(), "invalidated session is signed out");

        Ok(())
    }
}
