use crate::api::{Endpoint, NO_BODY};
use crate::error::ClientError;
use crate::guard::SessionGuard;
use crate::models::{DeleteMessageRequest, DeleteUserRequest, Draft};
use crate::session::EndReason;

pub const FILL_OUT_FIELDS: &str = "Please fill out the fields.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server acknowledged; apply the local effect.
    Applied,
    /// Show `reason`. With `resync`, the list is stale and must be refetched.
    Rejected { reason: String, resync: bool },
    /// Token missing or rejected; the guard already dropped it.
    SessionInvalid,
}

impl MutationOutcome {
    fn rejected(reason: impl Into<String>) -> Self {
        MutationOutcome::Rejected {
            reason: reason.into(),
            resync: false,
        }
    }

    fn from_error(e: ClientError, resync_on_not_found: bool) -> Self {
        if e.ends_session() {
            return MutationOutcome::SessionInvalid;
        }
        if e.is_transport_failure() {
            tracing::warn!("Mutation failed: {}", e);
        }
        MutationOutcome::Rejected {
            resync: resync_on_not_found && matches!(e, ClientError::NotFound(_)),
            reason: e.user_message(),
        }
    }
}

/// Single-item operations against the service, all through the guard.
pub struct MutationDispatcher<'a> {
    guard: SessionGuard<'a>,
}

impl<'a> MutationDispatcher<'a> {
    pub fn new(guard: SessionGuard<'a>) -> Self {
        Self { guard }
    }

    pub async fn delete_message(&self, id: &str) -> MutationOutcome {
        let request = DeleteMessageRequest { id };
        match self.guard.call(Endpoint::DeleteMessage, Some(&request)).await {
            Ok(_) => MutationOutcome::Applied,
            Err(e) => MutationOutcome::from_error(e, true),
        }
    }

    pub async fn delete_user(&self, username: &str) -> MutationOutcome {
        let request = DeleteUserRequest { uname: username };
        match self.guard.call(Endpoint::AdminDeleteUser, Some(&request)).await {
            Ok(_) => MutationOutcome::Applied,
            Err(e) => MutationOutcome::from_error(e, true),
        }
    }

    /// An empty recipient is refused locally, without a request.
    pub async fn send_message(&self, draft: &Draft) -> MutationOutcome {
        if let Err(e) = self.guard.ensure_session() {
            return MutationOutcome::from_error(e, false);
        }
        if draft.to.trim().is_empty() {
            return MutationOutcome::rejected(FILL_OUT_FIELDS);
        }
        match self.guard.call(Endpoint::CreateMessage, Some(draft)).await {
            Ok(_) => MutationOutcome::Applied,
            Err(e) => MutationOutcome::from_error(e, false),
        }
    }

    pub async fn logout(&self) -> MutationOutcome {
        self.end_session(Endpoint::Logout, EndReason::LoggedOut).await
    }

    pub async fn delete_account(&self) -> MutationOutcome {
        self.end_session(Endpoint::DeleteAccount, EndReason::AccountDeleted)
            .await
    }

    // Success drops the token here; a 401 already had it dropped by the guard.
    // Anything else keeps the session.
    async fn end_session(&self, endpoint: Endpoint, reason: EndReason) -> MutationOutcome {
        match self.guard.call(endpoint, NO_BODY).await {
            Ok(_) => {
                self.guard.session().invalidate(reason);
                MutationOutcome::Applied
            }
            Err(e) => MutationOutcome::from_error(e, false),
        }
    }
}
