use crate::api::{ApiClient, Endpoint};
use crate::error::{ClientError, GENERIC_FAILURE};
use crate::models::{Credentials, LoginResponse};
use crate::mutation::FILL_OUT_FIELDS;
use crate::session::Session;
use crate::view::Route;

/// Logging in with this name opens the admin view instead of the inbox.
pub const ADMIN_USERNAME: &str = "admin";

pub const USER_NOT_FOUND: &str = "User not found.";
pub const INCORRECT_PASSWORD: &str = "Incorrect password.";
pub const USER_EXISTS: &str = "User exists. Please pick a different username";
pub const USER_CREATED: &str = "User created. Redirecting to login.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn(Route),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    Rejected(String),
}

// --- Network Logic ---

/// On success the token is stored and the landing view returned. A 401 here
/// is a wrong password, not an expired session.
pub async fn login(api: &ApiClient, session: &Session, username: &str, password: &str) -> LoginOutcome {
    // The service accepts accounts with an empty password.
    if username.is_empty() {
        return LoginOutcome::Rejected(FILL_OUT_FIELDS.into());
    }
    let payload = Credentials { username, password };

    let result = match api.call(Endpoint::Login, Some(&payload), None).await {
        Ok(reply) => reply.json::<LoginResponse>(),
        Err(e) => Err(e),
    };
    match result {
        Ok(login_res) => {
            if let Err(e) = session.establish(&login_res.token) {
                tracing::error!("Could not store session token: {}", e);
                return LoginOutcome::Rejected(GENERIC_FAILURE.into());
            }
            tracing::info!("User '{}' logged in.", username);
            if username == ADMIN_USERNAME {
                LoginOutcome::LoggedIn(Route::Admin)
            } else {
                LoginOutcome::LoggedIn(Route::Inbox)
            }
        }
        Err(ClientError::NotFound(_)) => LoginOutcome::Rejected(USER_NOT_FOUND.into()),
        Err(ClientError::Unauthorized) => LoginOutcome::Rejected(INCORRECT_PASSWORD.into()),
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            LoginOutcome::Rejected(e.user_message())
        }
    }
}

pub async fn register(api: &ApiClient, username: &str, password: &str) -> RegisterOutcome {
    if username.is_empty() {
        return RegisterOutcome::Rejected(FILL_OUT_FIELDS.into());
    }
    let payload = Credentials { username, password };

    match api.call(Endpoint::CreateUser, Some(&payload), None).await {
        Ok(_) => {
            tracing::info!("Account '{}' created.", username);
            RegisterOutcome::Created
        }
        Err(ClientError::Conflict(_)) => RegisterOutcome::Rejected(USER_EXISTS.into()),
        Err(e) => {
            tracing::warn!("Account creation failed: {}", e);
            RegisterOutcome::Rejected(GENERIC_FAILURE.into())
        }
    }
}
