use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::api::ApiClient;
use crate::auth::{self, LoginOutcome, RegisterOutcome, USER_CREATED};
use crate::config::ClientConfig;
use crate::credentials::FileCredentialStore;
use crate::error::{ClientResult, GENERIC_FAILURE};
use crate::guard::SessionGuard;
use crate::models::{FromBackend, ToBackend};
use crate::mutation::{MutationDispatcher, MutationOutcome};
use crate::session::Session;
use crate::sync::{Cycle, Inbox, SyncOutcome, Synchronizer, UserDirectory};
use crate::view::Route;

pub const MESSAGE_SENT: &str = "Message sent.";

/// Everything the network side needs, shared between the command loop and
/// the poller.
pub struct Backend {
    api: ApiClient,
    session: Session,
    sync: Synchronizer,
}

impl Backend {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session,
            sync: Synchronizer::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let api = ApiClient::new(config)?;
        let session = Session::new(FileCredentialStore::new(&config.data_dir))?;
        Ok(Self::new(api, session))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    fn guard(&self) -> SessionGuard<'_> {
        SessionGuard::new(&self.session, &self.api)
    }

    fn dispatcher(&self) -> MutationDispatcher<'_> {
        MutationDispatcher::new(self.guard())
    }

    /// Runs one UI command to completion. The last event is always `Settled`.
    pub async fn handle(&self, action: ToBackend) -> Vec<FromBackend> {
        let mut events = match action {
            ToBackend::Start => self.start(),
            ToBackend::Login(username, password) => {
                match auth::login(&self.api, &self.session, &username, &password).await {
                    LoginOutcome::LoggedIn(route) => self.enter(route).await,
                    LoginOutcome::Rejected(reason) => vec![FromBackend::Status(reason)],
                }
            }
            ToBackend::Register(username, password) => {
                match auth::register(&self.api, &username, &password).await {
                    RegisterOutcome::Created => vec![
                        FromBackend::Navigate(Route::Login),
                        FromBackend::Status(USER_CREATED.into()),
                    ],
                    RegisterOutcome::Rejected(reason) => vec![FromBackend::Status(reason)],
                }
            }
            ToBackend::RefreshInbox => self.refresh_inbox().await,
            ToBackend::RefreshUsers => self.refresh_users().await,
            ToBackend::DeleteMessage(id) => match self
                .sync
                .exclusive(self.dispatcher().delete_message(&id))
                .await
            {
                MutationOutcome::Applied => vec![FromBackend::MessageRemoved(id)],
                MutationOutcome::Rejected { reason, resync } => {
                    let mut events = vec![FromBackend::Status(reason)];
                    if resync {
                        events.extend(self.refresh_inbox().await);
                    }
                    events
                }
                MutationOutcome::SessionInvalid => vec![FromBackend::Navigate(Route::Login)],
            },
            ToBackend::DeleteUser(username) => match self
                .sync
                .exclusive(self.dispatcher().delete_user(&username))
                .await
            {
                MutationOutcome::Applied => vec![FromBackend::UserRemoved(username)],
                MutationOutcome::Rejected { reason, resync } => {
                    let mut events = vec![FromBackend::Status(reason)];
                    if resync {
                        events.extend(self.refresh_users().await);
                    }
                    events
                }
                MutationOutcome::SessionInvalid => vec![FromBackend::Navigate(Route::Login)],
            },
            ToBackend::SendMessage(draft) => match self.dispatcher().send_message(&draft).await {
                MutationOutcome::Applied => vec![
                    FromBackend::MessageSent,
                    FromBackend::Status(MESSAGE_SENT.into()),
                ],
                MutationOutcome::Rejected { reason, .. } => vec![FromBackend::Status(reason)],
                MutationOutcome::SessionInvalid => vec![FromBackend::Navigate(Route::Login)],
            },
            ToBackend::Logout => session_ending(self.dispatcher().logout().await),
            ToBackend::DeleteAccount => session_ending(self.dispatcher().delete_account().await),
        };
        events.push(FromBackend::Settled);
        events
    }

    fn start(&self) -> Vec<FromBackend> {
        match self.session.token() {
            Ok(Some(_)) => vec![FromBackend::Navigate(Route::Inbox)],
            Ok(None) => vec![FromBackend::Navigate(Route::Login)],
            Err(e) => {
                tracing::error!("Could not read stored token: {}", e);
                vec![
                    FromBackend::Navigate(Route::Login),
                    FromBackend::Status(GENERIC_FAILURE.into()),
                ]
            }
        }
    }

    // The admin list is fetched once on entry; the inbox is left to the poller.
    async fn enter(&self, route: Route) -> Vec<FromBackend> {
        let mut events = vec![FromBackend::Navigate(route)];
        if route == Route::Admin {
            events.extend(self.refresh_users().await);
        }
        events
    }

    /// Full inbox resync, queued behind any cycle already running.
    pub async fn refresh_inbox(&self) -> Vec<FromBackend> {
        let outcome = self.sync.sync::<Inbox>(&self.guard()).await;
        sync_events(outcome, FromBackend::InboxSynced)
    }

    pub async fn refresh_users(&self) -> Vec<FromBackend> {
        let outcome = self.sync.sync::<UserDirectory>(&self.guard()).await;
        sync_events(outcome, FromBackend::UsersSynced)
    }

    /// One scheduled tick. `None` when the previous cycle is still running.
    pub async fn poll_inbox(&self) -> Option<Vec<FromBackend>> {
        let cycle = self.sync.try_begin()?;
        Some(self.inbox_cycle(&cycle).await)
    }

    async fn inbox_cycle(&self, cycle: &Cycle<'_>) -> Vec<FromBackend> {
        let outcome = cycle.fetch::<Inbox>(&self.guard()).await;
        sync_events(outcome, FromBackend::InboxSynced)
    }
}

fn sync_events<T>(outcome: SyncOutcome<T>, synced: fn(Vec<T>) -> FromBackend) -> Vec<FromBackend> {
    match outcome {
        SyncOutcome::Rendered(items) => vec![synced(items)],
        SyncOutcome::SessionInvalid => vec![FromBackend::Navigate(Route::Login)],
        SyncOutcome::FetchError(text) => vec![FromBackend::Status(text)],
    }
}

// Logout and self delete: success and 401 both leave the user logged out.
fn session_ending(outcome: MutationOutcome) -> Vec<FromBackend> {
    match outcome {
        MutationOutcome::Applied | MutationOutcome::SessionInvalid => {
            vec![FromBackend::Navigate(Route::Login)]
        }
        MutationOutcome::Rejected { reason, .. } => vec![FromBackend::Status(reason)],
    }
}

/// Recurring inbox sync. The first tick fires immediately. Dropping or
/// stopping the handle cancels the task; it also ends by itself once a
/// cycle reports the session gone.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(backend: Arc<Backend>, every: Duration, from_backend_tx: Sender<FromBackend>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(cycle) = backend.sync.try_begin() else {
                    continue;
                };
                let events = backend.inbox_cycle(&cycle).await;
                let session_over = events.contains(&FromBackend::Navigate(Route::Login));
                // Delivered before the cycle ends, so a delete queued behind
                // this tick is always reported after its list.
                for event in events {
                    if from_backend_tx.send(event).await.is_err() {
                        return;
                    }
                }
                drop(cycle);
                if session_over {
                    tracing::info!("Inbox polling stopped: session ended.");
                    return;
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        tracing::debug!("Inbox polling cancelled.");
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The backend task: handles UI commands one at a time and keeps exactly one
/// poller alive while the inbox is shown.
pub async fn run(
    backend: Arc<Backend>,
    mut to_backend_rx: Receiver<ToBackend>,
    from_backend_tx: Sender<FromBackend>,
    poll_interval: Duration,
) {
    let mut poller: Option<Poller> = None;

    while let Some(action) = to_backend_rx.recv().await {
        for event in backend.handle(action).await {
            let navigated_to = match &event {
                FromBackend::Navigate(route) => Some(*route),
                _ => None,
            };
            if from_backend_tx.send(event).await.is_err() {
                tracing::info!("UI closed, backend shutting down.");
                return;
            }
            // Started only after the UI has seen the navigation, so the first
            // sync cannot arrive ahead of it.
            if let Some(route) = navigated_to {
                if let Some(previous) = poller.take() {
                    previous.stop();
                }
                if route == Route::Inbox {
                    poller = Some(Poller::spawn(
                        backend.clone(),
                        poll_interval,
                        from_backend_tx.clone(),
                    ));
                }
            }
        }
    }
    if let Some(poller) = poller {
        poller.stop();
    }
}
