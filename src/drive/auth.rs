//! Installed-app OAuth for the Drive API.
//!
//! A cached token is reused while valid and refreshed when it expires. Without
//! a usable token the user is sent through the browser consent screen and the
//! redirect is captured on a loopback listener.

use crate::channels::StatusSender;
use crate::config::UploaderConfig;
use crate::drive::types::{
    ClientSecrets, ClientSecretsFile, StoredToken, TokenResponse, DRIVE_FILE_SCOPE,
};
use crate::error::AuthError;
use crate::upload::{AuthProvider, SessionHandle};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Url;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const CONSENT_DONE_PAGE: &str =
    "<html><body><p>Authentication finished. You can close this window.</p></body></html>";
const NOT_FOUND_PAGE: &str = "<html><body><p>Not found.</p></body></html>";

/// Hands the first consent result from the redirect handler to the waiting flow.
type ConsentSlot = Arc<Mutex<Option<oneshot::Sender<Result<String, AuthError>>>>>;

/// Load, store and delete the persisted token.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An unreadable or corrupt token is treated as absent.
    pub fn load(&self) -> Option<StoredToken> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read token {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring corrupt token {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn store(&self, token: &StoredToken) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content)
    }

    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthProvider {
    secrets_path: PathBuf,
    cache: TokenCache,
    http: reqwest::Client,
}

impl OAuthProvider {
    pub fn new(secrets_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            cache: TokenCache::new(token_path),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(&config.client_secrets_path, &config.token_path)
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Drops the stored token so the next upload asks for consent again.
    pub fn forget(&self) -> io::Result<()> {
        info!("Removing stored token {}", self.cache.path().display());
        self.cache.delete()
    }

    async fn acquire(&self, status: &StatusSender) -> Result<StoredToken, AuthError> {
        match self.cache.load() {
            Some(token) if token.is_valid_at(Utc::now()) => {
                debug!("Reusing cached token");
                Ok(token)
            }
            Some(token) if token.can_refresh() => match self.refresh(&token).await {
                Ok(token) => {
                    info!("Refreshed access token");
                    Ok(token)
                }
                Err(e) => {
                    warn!("Token refresh failed: {}", e);
                    if let Err(e) = self.cache.delete() {
                        warn!("Could not delete stale token: {}", e);
                    }
                    status.message(format!(
                        "The stored token '{}' was removed. Try the upload again to sign in.",
                        self.cache.path().display()
                    ));
                    Err(e)
                }
            },
            _ => self.consent(status).await,
        }
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::RefreshFailed("no refresh token".into()))?;

        let response = self
            .http
            .post(&token.token_uri)
            .form(&[
                ("client_id", token.client_id.as_str()),
                ("client_secret", token.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!("{} {}", status, body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;
        Ok(token.updated_with(body, Utc::now()))
    }

    async fn consent(&self, status: &StatusSender) -> Result<StoredToken, AuthError> {
        let secrets = load_client_secrets(&self.secrets_path)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
        let url = authorization_url(&secrets, &redirect_uri)?;

        status.message("Opening the browser for authentication...");
        if let Err(e) = open::that(url.as_str()) {
            warn!("Could not open browser: {}", e);
            status.message(format!("Open this address to continue: {}", url));
        }

        let code = tokio::time::timeout(CONSENT_TIMEOUT, accept_redirect(listener))
            .await
            .map_err(|_| AuthError::Cancelled("timed out waiting for consent".into()))??;

        let token = self.exchange_code(&secrets, &code, &redirect_uri).await?;
        status.message("Initial authentication complete.");
        Ok(token)
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<StoredToken, AuthError> {
        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("code", code),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Flow(format!(
                "code exchange returned {} {}",
                status, body
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(StoredToken::from_response(secrets, body, Utc::now()))
    }
}

#[async_trait]
impl AuthProvider for OAuthProvider {
    async fn session(&self, status: &StatusSender) -> Result<SessionHandle, AuthError> {
        let token = self.acquire(status).await?;
        if let Err(e) = self.cache.store(&token) {
            warn!(
                "Could not save token to {}: {}",
                self.cache.path().display(),
                e
            );
        }
        Ok(SessionHandle::new(token.access_token))
    }
}

pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets, AuthError> {
    if !path.exists() {
        return Err(AuthError::MissingClientSecrets(path.to_path_buf()));
    }
    let content =
        fs::read_to_string(path).map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;
    let file: ClientSecretsFile = serde_json::from_str(&content)
        .map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;
    file.installed
        .or(file.web)
        .ok_or_else(|| AuthError::InvalidClientSecrets("no 'installed' or 'web' section".into()))
}

pub fn authorization_url(secrets: &ClientSecrets, redirect_uri: &str) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", DRIVE_FILE_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthError::InvalidClientSecrets(format!("bad auth_uri: {}", e)))
}

/// Serves the loopback redirect until a request carries the consent result.
/// Dropping the returned future stops the listener.
async fn accept_redirect(listener: TcpListener) -> Result<String, AuthError> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let slot: ConsentSlot = Arc::new(Mutex::new(Some(result_tx)));

    let router = Router::new()
        .route("/", get(consent_redirect))
        .with_state(slot);

    tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            warn!("Consent listener stopped: {}", e);
        }
    });

    let result = result_rx
        .await
        .map_err(|_| AuthError::Flow("consent listener stopped early".into()))?;
    let _ = shutdown_tx.send(());
    result
}

async fn consent_redirect(
    State(slot): State<ConsentSlot>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let Some(result) = consent_result(&params) else {
        debug!("Ignoring loopback request without a consent result");
        return (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE));
    };

    if let Some(sender) = slot.lock().await.take() {
        let _ = sender.send(result);
    }
    (StatusCode::OK, Html(CONSENT_DONE_PAGE))
}

/// `Some(Ok(code))` on consent, `Some(Err(Cancelled))` on refusal, `None` for
/// requests that carry neither.
fn consent_result(params: &HashMap<String, String>) -> Option<Result<String, AuthError>> {
    if let Some(reason) = params.get("error") {
        return Some(Err(AuthError::Cancelled(reason.clone())));
    }
    params.get("code").map(|code| Ok(code.clone()))
}
