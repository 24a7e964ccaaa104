use std::future::Future;

use tokio::sync::{Mutex, MutexGuard};

use crate::api::{Endpoint, Reply, NO_BODY};
use crate::error::ClientResult;
use crate::guard::SessionGuard;
use crate::models::{Message, MessagesResponse, User, UsersResponse};

/// A server-owned list that is always fetched whole.
pub trait ListResource {
    type Item;
    const ENDPOINT: Endpoint;
    /// Status line text when a fetch fails for any non-session reason.
    const FAILURE: &'static str;

    fn decode(reply: &Reply) -> ClientResult<Vec<Self::Item>>;
}

/// The logged-in user's messages.
pub struct Inbox;

impl ListResource for Inbox {
    type Item = Message;
    const ENDPOINT: Endpoint = Endpoint::GetMessages;
    const FAILURE: &'static str = "Failed to load messages.";

    fn decode(reply: &Reply) -> ClientResult<Vec<Message>> {
        Ok(reply.json::<MessagesResponse>()?.messages)
    }
}

/// Every account, admin only.
pub struct UserDirectory;

impl ListResource for UserDirectory {
    type Item = User;
    const ENDPOINT: Endpoint = Endpoint::ListUsers;
    const FAILURE: &'static str = "Failed to load users.";

    fn decode(reply: &Reply) -> ClientResult<Vec<User>> {
        Ok(reply.json::<UsersResponse>()?.users)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    /// The complete authoritative list; the view replaces what it shows.
    Rendered(Vec<T>),
    SessionInvalid,
    FetchError(String),
}

/// Runs fetch cycles one at a time. Deletes take the same lock, so a fetch
/// that started before a delete is fully reported before the delete runs.
#[derive(Default)]
pub struct Synchronizer {
    cycle: Mutex<()>,
}

/// Held for the duration of one fetch cycle, including delivery of its result.
pub struct Cycle<'a> {
    _lock: MutexGuard<'a, ()>,
}

impl Cycle<'_> {
    pub async fn fetch<R: ListResource>(&self, guard: &SessionGuard<'_>) -> SyncOutcome<R::Item> {
        fetch::<R>(guard).await
    }
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any cycle in flight.
    pub async fn begin(&self) -> Cycle<'_> {
        Cycle {
            _lock: self.cycle.lock().await,
        }
    }

    /// `None` if a cycle or a delete is still running.
    pub fn try_begin(&self) -> Option<Cycle<'_>> {
        match self.cycle.try_lock() {
            Ok(lock) => Some(Cycle { _lock: lock }),
            Err(_) => {
                tracing::debug!("Sync cycle still running, tick skipped.");
                None
            }
        }
    }

    /// Waits for any cycle in flight, then runs a fresh one.
    pub async fn sync<R: ListResource>(&self, guard: &SessionGuard<'_>) -> SyncOutcome<R::Item> {
        self.begin().await.fetch::<R>(guard).await
    }

    /// Scheduled ticks use this: `None` if a cycle is still running.
    pub async fn try_sync<R: ListResource>(
        &self,
        guard: &SessionGuard<'_>,
    ) -> Option<SyncOutcome<R::Item>> {
        let cycle = self.try_begin()?;
        Some(cycle.fetch::<R>(guard).await)
    }

    /// Runs a list mutation with no fetch cycle in flight.
    pub async fn exclusive<F: Future>(&self, mutation: F) -> F::Output {
        let _cycle = self.cycle.lock().await;
        mutation.await
    }

    pub fn in_progress(&self) -> bool {
        self.cycle.try_lock().is_err()
    }
}

async fn fetch<R: ListResource>(guard: &SessionGuard<'_>) -> SyncOutcome<R::Item> {
    let result = match guard.call(R::ENDPOINT, NO_BODY).await {
        Ok(reply) => R::decode(&reply),
        Err(e) => Err(e),
    };
    match result {
        Ok(items) => {
            tracing::debug!("{} returned {} items.", R::ENDPOINT.path(), items.len());
            SyncOutcome::Rendered(items)
        }
        Err(e) if e.ends_session() => SyncOutcome::SessionInvalid,
        Err(e) => {
            tracing::warn!("{} sync failed: {}", R::ENDPOINT.path(), e);
            SyncOutcome::FetchError(R::FAILURE.to_string())
        }
    }
}
