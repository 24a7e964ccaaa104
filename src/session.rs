use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::credentials::CredentialStore;
use crate::error::ClientResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    /// Transient: the token is being dropped and the UI sent back to login.
    Invalidating,
}

/// Why a session ended. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The server answered 401.
    Rejected,
    /// A protected action was attempted without a token.
    Missing,
    LoggedOut,
    AccountDeleted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::Rejected => "token rejected by server",
            EndReason::Missing => "no token stored",
            EndReason::LoggedOut => "logged out",
            EndReason::AccountDeleted => "account deleted",
        };
        f.write_str(text)
    }
}

struct Inner {
    store: Box<dyn CredentialStore>,
    state: SessionState,
}

/// The client's single session. Every read or write of the token goes
/// through here; callers never keep the token past one request.
pub struct Session {
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(store: impl CredentialStore + 'static) -> ClientResult<Self> {
        let state = match store.get_token()? {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Anonymous,
        };
        Ok(Self {
            inner: Mutex::new(Inner {
                store: Box::new(store),
                state,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Current token, read fresh from the store.
    pub fn token(&self) -> ClientResult<Option<String>> {
        let mut inner = self.lock();
        let token = inner.store.get_token()?;
        if token.is_none() && inner.state == SessionState::Authenticated {
            inner.state = SessionState::Anonymous;
        }
        Ok(token)
    }

    /// Anonymous -> Authenticated, overwriting any stored token.
    pub fn establish(&self, token: &str) -> ClientResult<()> {
        let mut inner = self.lock();
        inner.store.set_token(token)?;
        inner.state = SessionState::Authenticated;
        tracing::info!("Session established.");
        Ok(())
    }

    /// Drops the token and returns to Anonymous. Cannot fail: a store error is
    /// logged and the in-memory state still ends up Anonymous.
    pub fn invalidate(&self, reason: EndReason) {
        let mut inner = self.lock();
        let previous = inner.state;
        inner.state = SessionState::Invalidating;
        if let Err(e) = inner.store.clear_token() {
            tracing::error!("Failed to clear stored token: {}", e);
        }
        inner.state = SessionState::Anonymous;
        if previous == SessionState::Authenticated {
            tracing::info!("Session ended: {}", reason);
        } else {
            tracing::debug!("Session already anonymous ({})", reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    #[test]
    fn stored_token_starts_authenticated() {
        let session = Session::new(MemoryCredentialStore::with_token("T")).unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.token().unwrap().as_deref(), Some("T"));
    }

    #[test]
    fn establish_then_invalidate() {
        let session = Session::new(MemoryCredentialStore::default()).unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);

        session.establish("abc").unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);

        session.invalidate(EndReason::Rejected);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.token().unwrap(), None);
    }

    #[test]
    fn login_overwrites_previous_token() {
        let session = Session::new(MemoryCredentialStore::with_token("old")).unwrap();
        session.establish("new").unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some("new"));
    }
}
