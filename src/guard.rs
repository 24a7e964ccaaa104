use serde::Serialize;

use crate::api::{ApiClient, Endpoint, Reply};
use crate::error::{ClientError, ClientResult};
use crate::session::{EndReason, Session};

/// Gate in front of every protected call.
///
/// This is the only place that reacts to a missing or rejected token: the
/// session is invalidated and the caller gets an error for which
/// [`ClientError::ends_session`] is true, so it can stop before touching
/// any view state.
#[derive(Clone, Copy)]
pub struct SessionGuard<'a> {
    session: &'a Session,
    api: &'a ApiClient,
}

impl<'a> SessionGuard<'a> {
    pub fn new(session: &'a Session, api: &'a ApiClient) -> Self {
        Self { session, api }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    /// The current token, or `Unauthenticated` without touching the network.
    pub fn ensure_session(&self) -> ClientResult<String> {
        match self.session.token()? {
            Some(token) => Ok(token),
            None => {
                self.session.invalidate(EndReason::Missing);
                Err(ClientError::Unauthenticated)
            }
        }
    }

    pub async fn call<B>(&self, endpoint: Endpoint, body: Option<&B>) -> ClientResult<Reply>
    where
        B: Serialize + ?Sized,
    {
        let token = self.ensure_session()?;
        match self.api.call(endpoint, body, Some(&token)).await {
            Err(ClientError::Unauthorized) => {
                tracing::warn!("{} answered 401, dropping session.", endpoint.path());
                self.session.invalidate(EndReason::Rejected);
                Err(ClientError::Unauthorized)
            }
            Ok(reply) => {
                // Logged out or replaced while the request was in flight.
                if self.session.token()?.as_deref() != Some(token.as_str()) {
                    tracing::debug!("Discarding {} reply from a stale session.", endpoint.path());
                    return Err(ClientError::Unauthenticated);
                }
                Ok(reply)
            }
            Err(e) => Err(e),
        }
    }
}
