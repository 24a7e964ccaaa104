use serde::{Deserialize, Serialize};

use crate::view::Route;

// --- Data Structures ---

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// The admin listing only carries usernames, sent as a bare string array.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct User {
    pub username: String,
}

#[derive(Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// Compose form contents, also the `createmsg` request body.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Draft {
    pub fn clear(&mut self) {
        self.to.clear();
        self.subject.clear();
        self.body.clear();
    }
}

#[derive(Serialize)]
pub struct DeleteMessageRequest<'a> {
    pub id: &'a str,
}

#[derive(Serialize)]
pub struct DeleteUserRequest<'a> {
    pub uname: &'a str,
}

// --- Messages between UI and Backend Thread ---

#[derive(Debug, Clone)]
pub enum ToBackend {
    /// Pick the first view from the stored credentials.
    Start,
    Login(String, String),
    Register(String, String),
    RefreshInbox,
    RefreshUsers,
    DeleteMessage(String),
    DeleteUser(String),
    SendMessage(Draft),
    Logout,
    DeleteAccount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromBackend {
    Navigate(Route),
    InboxSynced(Vec<Message>),
    UsersSynced(Vec<User>),
    MessageRemoved(String),
    UserRemoved(String),
    MessageSent,
    Status(String),
    /// One `ToBackend` command has been fully handled.
    Settled,
}
