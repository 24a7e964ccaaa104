//! Render state, keyed by server identifiers. The egui front end draws a
//! projection of [`ViewModel`] and never mutates it except through
//! [`ViewModel::apply`] and the form fields.

use crate::models::{Draft, FromBackend, Message, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Login,
    Register,
    Inbox,
    Admin,
}

/// Stable identity of a listed item. Deletes target this, never a position.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Message {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for User {
    fn key(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T, S> {
    pub item: T,
    pub ui: S,
}

/// Items in server order, each with its own local UI state `S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView<T, S = ()> {
    entries: Vec<Entry<T, S>>,
}

impl<T, S> Default for ListView<T, S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Keyed, S: Default> ListView<T, S> {
    /// Full replace: the old entries and their UI state are dropped.
    /// The new list is built first and swapped in whole.
    pub fn replace_all(&mut self, items: Vec<T>) {
        let mut entries: Vec<Entry<T, S>> = Vec::with_capacity(items.len());
        for item in items {
            if entries.iter().any(|e| e.item.key() == item.key()) {
                tracing::warn!("Duplicate key '{}' in fetched list, keeping the first.", item.key());
                continue;
            }
            entries.push(Entry {
                item,
                ui: S::default(),
            });
        }
        self.entries = entries;
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.item.key() != key);
        self.entries.len() != before
    }

    pub fn get(&self, key: &str) -> Option<&Entry<T, S>> {
        self.entries.iter().find(|e| e.item.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry<T, S>> {
        self.entries.iter_mut().find(|e| e.item.key() == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.item.key().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<T, S>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageUi {
    pub body_visible: bool,
}

impl Default for MessageUi {
    fn default() -> Self {
        Self { body_visible: true }
    }
}

pub type InboxList = ListView<Message, MessageUi>;
pub type UserList = ListView<User>;

impl ListView<Message, MessageUi> {
    /// Local only; lost on the next sync.
    pub fn toggle_body(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.ui.body_visible = !entry.ui.body_visible;
                true
            }
            None => false,
        }
    }
}

/// One status line per view, overwritten by the latest outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine(Option<String>);

impl StatusLine {
    pub fn set(&mut self, text: impl Into<String>) {
        self.0 = Some(text.into());
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn text(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct ViewModel {
    pub route: Route,
    pub inbox: InboxList,
    pub users: UserList,
    pub status: StatusLine,
    pub draft: Draft,
    pub login: LoginForm,
    in_flight: usize,
}

impl ViewModel {
    pub fn apply(&mut self, event: FromBackend) {
        match event {
            FromBackend::Navigate(route) => self.navigate(route),
            FromBackend::InboxSynced(messages) => {
                if self.route == Route::Inbox {
                    self.inbox.replace_all(messages);
                }
            }
            FromBackend::UsersSynced(users) => {
                if self.route == Route::Admin {
                    self.users.replace_all(users);
                }
            }
            FromBackend::MessageRemoved(id) => {
                self.inbox.remove(&id);
            }
            FromBackend::UserRemoved(username) => {
                self.users.remove(&username);
            }
            FromBackend::MessageSent => self.draft.clear(),
            FromBackend::Status(text) => self.status.set(text),
            FromBackend::Settled => self.in_flight = self.in_flight.saturating_sub(1),
        }
    }

    /// Like loading a new page: nothing rendered survives.
    pub fn navigate(&mut self, route: Route) {
        self.route = route;
        self.inbox.clear();
        self.users.clear();
        self.status.clear();
        self.draft.clear();
        self.login.password.clear();
    }

    /// Call once per command sent to the backend.
    pub fn dispatched(&mut self) {
        self.in_flight += 1;
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }
}
