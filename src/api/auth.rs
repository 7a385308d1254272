use std::sync::Arc;

use ahash::AHashMap;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::AUTHORIZATION;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::json_response;
use crate::app::api_error::ApiError;

/// In-memory user accounts and bearer-token sessions.
///
/// Passwords are stored as salted SHA-256 digests and accounts live only
/// for the process lifetime; there is deliberately no on-disk user store.
/// Session tokens are random UUIDs handed out by [`UserStore::login`] and
/// consumed by the dashboard's auth checks.
pub struct UserStore {
    users: RwLock<AHashMap<String, UserRecord>>,
    sessions: RwLock<AHashMap<String, String>>,
}

struct UserRecord {
    salt: String,
    password_digest: String,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        UserStore {
            users: RwLock::new(AHashMap::new()),
            sessions: RwLock::new(AHashMap::new()),
        }
    }

    /// Registers a new account. Returns `false` when the username is
    /// already taken.
    pub async fn signup(&self, username: &str, password: &str) -> bool {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return false;
        }

        let salt = Uuid::new_v4().to_string();
        let password_digest = password_digest(&salt, password);
        users.insert(
            username.to_string(),
            UserRecord {
                salt,
                password_digest,
            },
        );
        true
    }

    /// Verifies credentials and issues a session token on success.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        let users = self.users.read().await;
        let record = users.get(username)?;
        if password_digest(&record.salt, password) != record.password_digest {
            return None;
        }
        drop(users);

        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), username.to_string());
        Some(token)
    }

    /// The username behind a session token, if the token is live.
    pub async fn username_for_token(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions.get(token).cloned()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[derive(Deserialize)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

/// `POST /api/auth/signup`
pub async fn signup(
    req: Request<Full<Bytes>>,
    users: Arc<UserStore>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let (username, password) = match read_credentials(req).await {
        Some(credentials) => credentials,
        None => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": "username and password required"}),
            ));
        }
    };

    if users.signup(&username, &password).await {
        Ok(json_response(
            StatusCode::CREATED,
            json!({"status": "created"}),
        ))
    } else {
        Ok(json_response(
            StatusCode::CONFLICT,
            json!({"error": "username already exists"}),
        ))
    }
}

/// `POST /api/auth/login`
pub async fn login(
    req: Request<Full<Bytes>>,
    users: Arc<UserStore>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let (username, password) = match read_credentials(req).await {
        Some(credentials) => credentials,
        None => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": "username and password required"}),
            ));
        }
    };

    match users.login(&username, &password).await {
        Some(token) => Ok(json_response(StatusCode::OK, json!({"token": token}))),
        None => Ok(json_response(
            StatusCode::UNAUTHORIZED,
            json!({"error": "invalid credentials"}),
        )),
    }
}

/// `GET /api/auth/profile`
pub async fn profile(
    req: Request<Full<Bytes>>,
    users: Arc<UserStore>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    match authorized_user(&req, &users).await {
        Some(username) => Ok(json_response(StatusCode::OK, json!({"username": username}))),
        None => Ok(unauthorized()),
    }
}

/// Resolves the request's bearer token to a username, if any.
pub(crate) async fn authorized_user(
    req: &Request<Full<Bytes>>,
    users: &UserStore,
) -> Option<String> {
    let token = bearer_token(req)?;
    users.username_for_token(&token).await
}

/// The standard 401 body shared by the authenticated endpoints.
pub(crate) fn unauthorized() -> Response<Full<Bytes>> {
    json_response(StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"}))
}

fn bearer_token(req: &Request<Full<Bytes>>) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

async fn read_credentials(req: Request<Full<Bytes>>) -> Option<(String, String)> {
    // Full<Bytes> collection is infallible
    let body = req.into_body().collect().await.unwrap().to_bytes();
    let credentials: Credentials = serde_json::from_slice(&body).ok()?;

    let username = credentials.username.filter(|name| !name.is_empty())?;
    let password = credentials.password.filter(|word| !word.is_empty())?;
    Some((username, password))
}
