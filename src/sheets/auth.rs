//! OAuth credential handling for the remote spreadsheet source.
//!
//! A reusable credential lives in a token cache file under the user's config
//! dir. Expired tokens are refreshed transparently when a refresh token is
//! present; otherwise the interactive flow runs: a loopback listener on an
//! ephemeral port takes the redirect, the code is exchanged at the token
//! endpoint, and the credential is persisted for later runs.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AuthError;

pub const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets.readonly \
                          https://www.googleapis.com/auth/drive.readonly";

/// Leeway before the recorded expiry at which a token is already treated as
/// expired.
const EXPIRY_LEEWAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: ClientSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) past which `access_token` is stale.
    pub expires_at: u64,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now + EXPIRY_LEEWAY.as_secs() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + self.expires_in,
        }
    }
}

/// Loads the client secret, owns the token cache, and produces access tokens.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: ClientSecret,
    cache_path: PathBuf,
    http: Client,
}

impl Authenticator {
    /// Read the installed-app client secret. Its absence is fatal for the
    /// spreadsheet path.
    pub fn load(
        secret_path: impl AsRef<Path>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self, AuthError> {
        let secret_path = secret_path.as_ref();
        if !secret_path.exists() {
            return Err(AuthError::MissingClientSecret(secret_path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(secret_path)?;
        let parsed: ClientSecretFile =
            serde_json::from_str(&raw).map_err(|source| AuthError::MalformedClientSecret {
                path: secret_path.to_path_buf(),
                source,
            })?;

        Ok(Authenticator {
            secret: parsed.installed,
            cache_path: cache_path.into(),
            http: Client::new(),
        })
    }

    /// Produce an access token without user interaction: a valid cached token
    /// as-is, an expired one via transparent refresh. Fails with
    /// [`AuthError::NeedsAuthorization`] when the interactive step is the only
    /// way forward.
    pub async fn cached_token(&self) -> Result<String, AuthError> {
        let stored = match self.read_cache() {
            Some(stored) => stored,
            None => return Err(AuthError::NeedsAuthorization),
        };

        if !stored.is_expired() {
            debug!("Using cached access token");
            return Ok(stored.access_token);
        }

        match &stored.refresh_token {
            Some(refresh_token) => {
                info!("Cached token expired, refreshing");
                let refreshed = self.refresh(refresh_token).await?;
                let token = refreshed.into_stored(stored.refresh_token.clone());
                self.write_cache(&token)?;
                Ok(token.access_token)
            }
            None => Err(AuthError::NeedsAuthorization),
        }
    }

    /// Start the interactive flow: bind a loopback listener on an ephemeral
    /// port and build the authorization URL the user must open.
    pub fn begin_interactive(&self) -> Result<PendingAuthorization, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}");

        let url = Url::parse_with_params(
            &self.secret.auth_uri,
            [
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|err| AuthError::BadAuthUri(err.to_string()))?;

        info!("Authorization required, open: {url}");

        Ok(PendingAuthorization {
            listener,
            redirect_uri,
            url: url.to_string(),
            authenticator: self.clone(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        self.token_request(&params).await
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRejected(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }

    fn read_cache(&self) -> Option<StoredToken> {
        let raw = std::fs::read_to_string(&self.cache_path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(err) => {
                warn!("Ignoring unreadable token cache {:?}: {err}", self.cache_path);
                None
            }
        }
    }

    fn write_cache(&self, token: &StoredToken) -> Result<(), AuthError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(token).map_err(|err| {
            AuthError::TokenRejected(format!("could not serialize credential: {err}"))
        })?;
        std::fs::write(&self.cache_path, raw)?;
        debug!("Persisted credential to {:?}", self.cache_path);
        Ok(())
    }
}

/// An in-flight interactive authorization: the listener is bound and the URL
/// is ready to show; `finish` blocks until the redirect delivers a code.
#[derive(Debug)]
pub struct PendingAuthorization {
    listener: TcpListener,
    redirect_uri: String,
    url: String,
    authenticator: Authenticator,
}

impl PendingAuthorization {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the browser redirect, exchange the code, persist the
    /// credential, and hand back the access token.
    pub async fn finish(self) -> Result<String, AuthError> {
        let listener = self.listener;
        let code = tokio::task::spawn_blocking(move || wait_for_code(&listener))
            .await
            .map_err(|err| AuthError::RedirectFailed(err.to_string()))??;

        let response = self
            .authenticator
            .exchange_code(&code, &self.redirect_uri)
            .await?;
        let token = response.into_stored(None);
        self.authenticator.write_cache(&token)?;
        info!("Authorization complete");
        Ok(token.access_token)
    }
}

/// What one connection on the loopback port turned out to be.
#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code(String),
    Denied(String),
    Unrelated,
}

/// Serve the loopback port until the redirect delivers a `code` or an
/// `error`. Stray requests on the port (favicon fetches, probes) are answered
/// and ignored.
fn wait_for_code(listener: &TcpListener) -> Result<String, AuthError> {
    loop {
        let (stream, _) = listener.accept()?;
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        let redirect = parse_redirect_request_line(&request_line);

        let (status, body) = match &redirect {
            Redirect::Code(_) => ("200 OK", "Authorization complete. You may close this tab."),
            Redirect::Denied(_) => {
                ("400 Bad Request", "Authorization failed. Check the application log.")
            }
            Redirect::Unrelated => ("404 Not Found", ""),
        };
        let mut stream = reader.into_inner();
        let _ = write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );

        match redirect {
            Redirect::Code(code) => return Ok(code),
            Redirect::Denied(error) => return Err(AuthError::RedirectFailed(error)),
            Redirect::Unrelated => {
                debug!("Ignoring unrelated request on the redirect port: {request_line:?}");
            }
        }
    }
}

fn parse_redirect_request_line(line: &str) -> Redirect {
    let Some(target) = line.split_whitespace().nth(1) else {
        return Redirect::Unrelated;
    };
    let Ok(url) = Url::parse(&format!("http://127.0.0.1{target}")) else {
        return Redirect::Unrelated;
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => return Redirect::Code(value.into_owned()),
            "error" => return Redirect::Denied(value.into_owned()),
            _ => {}
        }
    }
    Redirect::Unrelated
}
