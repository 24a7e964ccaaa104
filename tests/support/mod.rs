//! In-process stand-in for the messaging service, speaking the same REST
//! contract (including its inconsistent error payload shapes).

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use posta::credentials::MemoryCredentialStore;
use posta::{ApiClient, Backend, ClientConfig, Session};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A canned answer used instead of the normal logic for one request.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(StatusCode, Value),
    /// 200 with a body that is not JSON.
    Garbage,
}

#[derive(Default)]
struct FakeState {
    users: HashMap<String, String>,
    sessions: HashMap<String, String>,
    messages: Vec<StoredMessage>,
    hits: HashMap<String, usize>,
    scripted: HashMap<String, VecDeque<Scripted>>,
    delays: HashMap<String, Duration>,
    next_id: u64,
}

type SharedState = Arc<Mutex<FakeState>>;

#[derive(Clone)]
pub struct FakeServer {
    pub url: String,
    state: SharedState,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = SharedState::default();
        let app = Router::new()
            .route("/api/:name", post(api))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.url).unwrap();
        config.http_timeout = Duration::from_secs(5);
        config.poll_interval = Duration::from_millis(25);
        config
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.config()).unwrap()
    }

    /// A backend with no stored token.
    pub fn anonymous_backend(&self) -> Backend {
        Backend::new(self.api(), Session::new(MemoryCredentialStore::default()).unwrap())
    }

    /// A backend already holding a token the server accepts for `username`.
    pub fn backend_for(&self, username: &str) -> Backend {
        self.add_user(username, "secret");
        let token = format!("token-{}", username);
        self.add_session(&token, username);
        Backend::new(
            self.api(),
            Session::new(MemoryCredentialStore::with_token(token)).unwrap(),
        )
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.lock()
            .users
            .insert(username.to_string(), password.to_string());
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.lock().users.contains_key(username)
    }

    pub fn add_session(&self, token: &str, username: &str) {
        self.lock()
            .sessions
            .insert(token.to_string(), username.to_string());
    }

    pub fn expire_sessions(&self) {
        self.lock().sessions.clear();
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn deliver(&self, from: &str, to: &str, subject: &str) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("m{}", state.next_id);
        state.messages.push(StoredMessage {
            id: id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!("body of {}", subject),
        });
        id
    }

    /// Another actor deleting a message.
    pub fn remove_message(&self, id: &str) {
        self.lock().messages.retain(|m| m.id != id);
    }

    pub fn inbox_of(&self, username: &str) -> Vec<StoredMessage> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.to == username)
            .cloned()
            .collect()
    }

    pub fn script(&self, name: &str, answer: Scripted) {
        self.lock()
            .scripted
            .entry(name.to_string())
            .or_default()
            .push_back(answer);
    }

    /// Every later request to `name` sleeps first, then reads the state.
    pub fn delay(&self, name: &str, by: Duration) {
        self.lock().delays.insert(name.to_string(), by);
    }

    pub fn hits(&self, name: &str) -> usize {
        self.lock().hits.get(name).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.lock().hits.values().sum()
    }
}

// --- Handlers ---

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

async fn api(
    State(shared): State<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delay = {
        let mut state = shared.lock().unwrap();
        *state.hits.entry(name.clone()).or_default() += 1;
        state.delays.get(&name).copied()
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = shared.lock().unwrap();

    if let Some(answer) = state.scripted.get_mut(&name).and_then(VecDeque::pop_front) {
        return match answer {
            Scripted::Reply(status, body) => reply(status, body),
            Scripted::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        };
    }

    let parsed: Option<Value> = serde_json::from_slice(&body).ok();

    // Unauthenticated endpoints.
    match name.as_str() {
        "login" => {
            let Some(body) = parsed else {
                return reply(StatusCode::BAD_REQUEST, json!(["error", "could not parse JSON"]));
            };
            let username = field(&body, "username").unwrap_or_default();
            let password = field(&body, "password").unwrap_or_default();
            let stored = state.users.get(&username).cloned();
            return match stored {
                None => reply(StatusCode::NOT_FOUND, json!({ "error": "user not found" })),
                Some(stored) if stored != password => {
                    reply(StatusCode::UNAUTHORIZED, json!({ "error": "incorrect password" }))
                }
                Some(_) => {
                    state.next_id += 1;
                    let token = format!("issued-{}", state.next_id);
                    state.sessions.insert(token.clone(), username.clone());
                    reply(
                        StatusCode::OK,
                        json!({ "success": true, "token": token, "username": username }),
                    )
                }
            };
        }
        "createusr" => {
            let Some(body) = parsed else {
                return reply(StatusCode::BAD_REQUEST, json!(["error", "could not parse JSON"]));
            };
            let username = field(&body, "username").unwrap_or_default();
            if state.users.contains_key(&username) {
                return reply(StatusCode::CONFLICT, json!(["error", "user exists."]));
            }
            let password = field(&body, "password").unwrap_or_default();
            state.users.insert(username, password);
            return StatusCode::OK.into_response();
        }
        _ => {}
    }

    let Some(user) = bearer(&headers).and_then(|token| state.sessions.get(&token).cloned()) else {
        return reply(StatusCode::UNAUTHORIZED, json!(["error", "session expired"]));
    };

    match name.as_str() {
        "getmsgs" => {
            let messages: Vec<Value> = state
                .messages
                .iter()
                .rev()
                .filter(|m| m.to == user)
                .map(|m| {
                    json!({ "id": m.id, "from": m.from, "to": m.to, "subject": m.subject, "body": m.body })
                })
                .collect();
            reply(StatusCode::OK, json!({ "messages": messages }))
        }
        "createmsg" => {
            let Some(body) = parsed else {
                return reply(StatusCode::BAD_REQUEST, json!({ "error": "failed to parse JSON" }));
            };
            let to = field(&body, "to").unwrap_or_default();
            if !state.users.contains_key(&to) {
                return reply(StatusCode::NOT_FOUND, json!(["error", "recipient does not exist"]));
            }
            state.next_id += 1;
            let id = format!("m{}", state.next_id);
            state.messages.push(StoredMessage {
                id,
                from: user,
                to,
                subject: field(&body, "subject").unwrap_or_default(),
                body: field(&body, "body").unwrap_or_default(),
            });
            reply(StatusCode::OK, json!({ "status": "message sent." }))
        }
        "delmsg" => {
            let Some(id) = parsed.as_ref().and_then(|b| field(b, "id")) else {
                return reply(StatusCode::BAD_REQUEST, json!(["error", "failed to parse JSON"]));
            };
            let before = state.messages.len();
            state.messages.retain(|m| !(m.id == id && m.to == user));
            if state.messages.len() == before {
                return reply(StatusCode::NOT_FOUND, json!({ "error": "message not found" }));
            }
            reply(StatusCode::OK, json!({ "status": "Success" }))
        }
        "logout" => {
            state.sessions.retain(|_, owner| *owner != user);
            StatusCode::OK.into_response()
        }
        "delusr" => {
            state.users.remove(&user);
            state.sessions.retain(|_, owner| *owner != user);
            reply(StatusCode::OK, json!({}))
        }
        "lsusrs" | "a_delusr" if user != "admin" => {
            reply(StatusCode::UNAUTHORIZED, json!(["error", "admin only"]))
        }
        "lsusrs" => {
            let mut users: Vec<&String> = state.users.keys().collect();
            users.sort();
            reply(StatusCode::OK, json!({ "users": users }))
        }
        "a_delusr" => {
            let Some(uname) = parsed.as_ref().and_then(|b| field(b, "uname")) else {
                return reply(StatusCode::BAD_REQUEST, json!({ "error": "failed to parse JSON" }));
            };
            if state.users.remove(&uname).is_none() {
                return reply(StatusCode::NOT_FOUND, json!({ "error": "user not found" }));
            }
            state.sessions.retain(|_, owner| *owner != uname);
            reply(StatusCode::OK, json!({ "status": "deleted" }))
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
