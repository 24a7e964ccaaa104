use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, GENERIC_FAILURE};

/// Placeholder for calls that send no request body.
pub const NO_BODY: Option<&'static ()> = None;

/// The service's endpoints. All of them are `POST /api/<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    CreateUser,
    GetMessages,
    CreateMessage,
    DeleteMessage,
    Logout,
    DeleteAccount,
    ListUsers,
    AdminDeleteUser,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "/api/login",
            Endpoint::CreateUser => "/api/createusr",
            Endpoint::GetMessages => "/api/getmsgs",
            Endpoint::CreateMessage => "/api/createmsg",
            Endpoint::DeleteMessage => "/api/delmsg",
            Endpoint::Logout => "/api/logout",
            Endpoint::DeleteAccount => "/api/delusr",
            Endpoint::ListUsers => "/api/lsusrs",
            Endpoint::AdminDeleteUser => "/api/a_delusr",
        }
    }

    /// Not enforced by [`ApiClient`]; the session guard checks it.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Endpoint::Login | Endpoint::CreateUser)
    }
}

/// A 2xx answer. The payload is decoded only when a caller needs it.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    body: Vec<u8>,
}

impl Reply {
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = HttpClient::builder().timeout(config.http_timeout);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            base_url: config.api_base_url.clone(),
            http: builder.build()?,
        })
    }

    /// Endpoint paths are joined relative to the base, keeping any prefix it has.
    pub fn url(&self, endpoint: Endpoint) -> ClientResult<Url> {
        self.base_url
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("{}: {}", endpoint.path(), e)))
    }

    /// Sends one request and classifies the answer by status code alone.
    /// A token, when given, goes out as a bearer credential.
    pub async fn call<B>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
        token: Option<&str>,
    ) -> ClientResult<Reply>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.post(self.url(endpoint)?);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} unreachable: {}", endpoint.path(), e);
            e
        })?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!("{} -> {}", endpoint.path(), status);

        classify(status, &body)?;
        Ok(Reply {
            status,
            body: body.to_vec(),
        })
    }
}

/// Maps a status to the client's error taxonomy. 2xx is `Ok`.
pub fn classify(status: StatusCode, body: &[u8]) -> ClientResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = server_message(body);
    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => {
            ClientError::NotFound(message.unwrap_or_else(|| "Not found.".to_string()))
        }
        StatusCode::BAD_REQUEST => {
            ClientError::BadRequest(message.unwrap_or_else(|| GENERIC_FAILURE.to_string()))
        }
        StatusCode::CONFLICT => {
            ClientError::Conflict(message.unwrap_or_else(|| GENERIC_FAILURE.to_string()))
        }
        _ => ClientError::Status { status, message },
    })
}

/// Pulls the human readable text out of an error payload. The service is not
/// consistent: it sends `{"error": ..}`, `["error", ..]`, or plain text.
pub fn server_message(body: &[u8]) -> Option<String> {
    let text = match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(Value::Object(map)) => ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))?
            .to_string(),
        Ok(Value::Array(items)) => match items.as_slice() {
            [Value::String(_), Value::String(text)] => text.clone(),
            _ => return None,
        },
        Ok(_) => return None,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_protected_endpoint_requires_auth() {
        assert!(!Endpoint::Login.requires_auth());
        assert!(!Endpoint::CreateUser.requires_auth());
        for endpoint in [
            Endpoint::GetMessages,
            Endpoint::CreateMessage,
            Endpoint::DeleteMessage,
            Endpoint::Logout,
            Endpoint::DeleteAccount,
            Endpoint::ListUsers,
            Endpoint::AdminDeleteUser,
        ] {
            assert!(endpoint.requires_auth(), "{:?}", endpoint);
            assert!(endpoint.path().starts_with("/api/"));
        }
    }

    #[test]
    fn url_joins_base_and_path() {
        let config = ClientConfig::new("http://localhost:8080/").unwrap();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.url(Endpoint::DeleteMessage).unwrap().as_str(),
            "http://localhost:8080/api/delmsg"
        );

        let config = ClientConfig::new("https://example.com/mail").unwrap();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.url(Endpoint::ListUsers).unwrap().as_str(),
            "https://example.com/mail/api/lsusrs"
        );
    }

    #[test]
    fn classification_is_status_driven() {
        assert!(classify(StatusCode::OK, b"").is_ok());
        assert!(classify(StatusCode::NO_CONTENT, b"").is_ok());
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, br#"{"error":"session expired"}"#),
            Err(ClientError::Unauthorized)
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, br#"{"error":"not found"}"#),
            Err(ClientError::NotFound(msg)) if msg == "not found"
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, br#"["error","failed to parse JSON"]"#),
            Err(ClientError::BadRequest(msg)) if msg == "failed to parse JSON"
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, br#"["error","user exists."]"#),
            Err(ClientError::Conflict(msg)) if msg == "user exists."
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, b""),
            Err(ClientError::Status { status, message: None }) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn message_shapes() {
        assert_eq!(server_message(br#"{"message":"bad token"}"#).as_deref(), Some("bad token"));
        assert_eq!(server_message(br#""plain json string""#).as_deref(), Some("plain json string"));
        assert_eq!(server_message(b"Username already exists").as_deref(), Some("Username already exists"));
        assert_eq!(server_message(b""), None);
        assert_eq!(server_message(br#"{"status":"ok"}"#), None);
        assert_eq!(server_message(br#"[1,2]"#), None);
    }

    #[test]
    fn missing_messages_fall_back() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, b""),
            Err(ClientError::NotFound(msg)) if msg == "Not found."
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, b"{}"),
            Err(ClientError::BadRequest(msg)) if msg == GENERIC_FAILURE
        ));
    }
}
