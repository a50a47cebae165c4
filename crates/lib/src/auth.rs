//! Session establishment: the login form, the `POST /login` client and display-name entry.

use crate::message::Sender;
use crate::session::{Session, SessionStore};
use crate::transport::{LoginRequest, LoginResponse};
use async_trait::async_trait;

/// Shown when the server rejects a login without giving a reason.
pub const DEFAULT_REJECTED_MESSAGE: &str = "Login failed.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Enter both an id and a password.")]
    MissingCredentials,
    #[error("Enter a display name.")]
    MissingName,
    /// Server answered but refused; carries the text to show.
    #[error("{0}")]
    Rejected(String),
    /// Request failed or the response was unreadable; carries the underlying cause for logs.
    #[error("Could not reach the server.")]
    Unreachable(String),
}

/// Performs the credential check. [`LoginClient`] talks HTTP; tests substitute their own.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, id: &str, password: &str) -> Result<Sender, LoginError>;
}

/// HTTP client for `POST {base_url}/login`.
#[derive(Clone)]
pub struct LoginClient {
    base_url: String,
    client: reqwest::Client,
}

impl LoginClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }
}

#[async_trait]
impl Authenticator for LoginClient {
    async fn authenticate(&self, id: &str, password: &str) -> Result<Sender, LoginError> {
        let body = LoginRequest {
            id: id.to_string(),
            password: password.to_string(),
        };
        let res = self
            .client
            .post(self.login_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| LoginError::Unreachable(e.to_string()))?;
        let status_ok = res.status().is_success();
        let data: LoginResponse = res
            .json()
            .await
            .map_err(|e| LoginError::Unreachable(e.to_string()))?;
        match data.user {
            Some(user) if status_ok && data.success => Ok(user),
            _ => Err(LoginError::Rejected(
                data.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTED_MESSAGE.to_string()),
            )),
        }
    }
}

/// Credentials typed on the entry screen and the single error line under them.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub id: String,
    pub password: String,
    error: Option<String>,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Clear the previous error and validate. Returns the credentials to send, or `None` after
    /// recording a validation error. Inputs are never modified.
    pub fn begin_submit(&mut self) -> Option<(String, String)> {
        self.error = None;
        if self.id.trim().is_empty() || self.password.trim().is_empty() {
            self.error = Some(LoginError::MissingCredentials.to_string());
            return None;
        }
        Some((self.id.clone(), self.password.clone()))
    }

    /// Apply the authentication outcome. On success the session is saved to `store` and
    /// returned; on failure the error line is set and the inputs stay as they were.
    pub fn finish(
        &mut self,
        result: Result<Sender, LoginError>,
        store: &SessionStore,
    ) -> Option<Session> {
        let user = match result {
            Ok(user) => user,
            Err(e) => {
                if let LoginError::Unreachable(cause) = &e {
                    log::warn!("login request failed: {}", cause);
                }
                self.error = Some(e.to_string());
                return None;
            }
        };
        match Session::new(user.id, user.name) {
            Ok(session) => {
                store.save(&session);
                log::info!("logged in as {}", session.id());
                Some(session)
            }
            Err(e) => {
                log::warn!("login response carried an unusable user: {}", e);
                self.error = Some(DEFAULT_REJECTED_MESSAGE.to_string());
                None
            }
        }
    }

    /// Validate, authenticate once and record the outcome. `Some` means: go to the chat view.
    pub async fn submit<A>(&mut self, auth: &A, store: &SessionStore) -> Option<Session>
    where
        A: Authenticator + ?Sized,
    {
        let (id, password) = self.begin_submit()?;
        let result = auth.authenticate(&id, &password).await;
        self.finish(result, store)
    }
}

/// Entry-only variant: accept a display name, trimmed. No network call is involved.
pub fn enter_display_name(input: &str) -> Result<String, LoginError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(LoginError::MissingName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        calls: AtomicUsize,
        reply: Result<Sender, LoginError>,
    }

    impl Scripted {
        fn new(reply: Result<Sender, LoginError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait]
    impl Authenticator for Scripted {
        async fn authenticate(&self, _id: &str, _password: &str) -> Result<Sender, LoginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn alice() -> Sender {
        Sender {
            id: "u1".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn blank_fields_issue_no_request() {
        let store = SessionStore::new();
        for (id, pw) in [("", "pw"), ("u1", "   "), (" \t", "\n"), ("", "")] {
            let auth = Scripted::new(Ok(alice()));
            let mut form = LoginForm {
                id: id.to_string(),
                password: pw.to_string(),
                ..LoginForm::default()
            };
            assert!(form.submit(&auth, &store).await.is_none());
            assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
            assert_eq!(form.error(), Some("Enter both an id and a password."));
            assert_eq!(form.id, id);
            assert_eq!(form.password, pw);
        }
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn success_saves_returned_user() {
        let store = SessionStore::new();
        let auth = Scripted::new(Ok(Sender {
            id: "server-id".to_string(),
            name: "Server Name".to_string(),
        }));
        let mut form = LoginForm {
            id: "typed".to_string(),
            password: "pw".to_string(),
            ..LoginForm::default()
        };
        let session = form.submit(&auth, &store).await.unwrap();
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.id(), "server-id");
        assert_eq!(store.load(), Some(session));
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn rejection_keeps_input_and_shows_one_error() {
        let store = SessionStore::new();
        let auth = Scripted::new(Err(LoginError::Rejected("wrong password".to_string())));
        let mut form = LoginForm {
            id: "u1".to_string(),
            password: "bad".to_string(),
            ..LoginForm::default()
        };
        assert!(form.submit(&auth, &store).await.is_none());
        assert_eq!(form.error(), Some("wrong password"));
        assert_eq!((form.id.as_str(), form.password.as_str()), ("u1", "bad"));
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn unreachable_server_shows_generic_error_and_clears_on_retry() {
        let store = SessionStore::new();
        let auth = Scripted::new(Err(LoginError::Unreachable("connection refused".to_string())));
        let mut form = LoginForm {
            id: "u1".to_string(),
            password: "pw".to_string(),
            ..LoginForm::default()
        };
        assert!(form.submit(&auth, &store).await.is_none());
        assert_eq!(form.error(), Some("Could not reach the server."));

        let ok = Scripted::new(Ok(alice()));
        assert!(form.submit(&ok, &store).await.is_some());
        assert!(form.error().is_none());
    }

    #[test]
    fn user_with_empty_name_is_rejected() {
        let store = SessionStore::new();
        let mut form = LoginForm::new();
        let result = Ok(Sender {
            id: "u1".to_string(),
            name: String::new(),
        });
        assert!(form.finish(result, &store).is_none());
        assert_eq!(form.error(), Some(DEFAULT_REJECTED_MESSAGE));
        assert!(store.load().is_none());
    }

    #[test]
    fn display_name_is_trimmed() {
        assert_eq!(enter_display_name("  Alice "), Ok("Alice".to_string()));
        assert_eq!(enter_display_name("   "), Err(LoginError::MissingName));
    }

    #[test]
    fn login_url_strips_trailing_slash() {
        let client = LoginClient::new("http://localhost:3001/");
        assert_eq!(client.login_url(), "http://localhost:3001/login");
    }
}
