//! Authentication session for Google APIs.
//!
//! Tokens come from, in order: the cached `token.json`, a refresh-token grant,
//! a service account key, or an interactive authorization with desktop OAuth
//! client secrets. Refreshed and newly authorized tokens are written back.

use std::fs;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ConfigPaths;
use crate::error::{DriveError, Result};
use crate::models::{CredentialsFile, OAuthClientSecret, ServiceAccountCredentials, TokenResponse};

/// Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 consent endpoint.
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Loopback redirect; the browser lands on an unreachable page whose URL carries the code.
const REDIRECT_URI: &str = "http://localhost";

/// Read-only access is all gcmd needs.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.readonly",
    "https://www.googleapis.com/auth/drive.metadata.readonly",
];

/// Tokens this close to expiry are refreshed up front.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// Cached token in the authorized-user layout written by Google's client libraries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// A token without an expiry never goes stale on its own.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry > now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => true,
        }
    }

    fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        token_uri: &str,
        client: Option<&OAuthClientSecret>,
    ) -> Self {
        Self {
            token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            token_uri: Some(token_uri.to_string()),
            client_id: client.map(|c| c.client_id.clone()),
            client_secret: client.map(|c| c.client_secret.clone()),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: Some(Utc::now() + Duration::seconds(response.expires_in as i64)),
        }
    }
}

/// Owns the credentials and the token cache for one invocation.
pub struct AuthSession {
    paths: Option<ConfigPaths>,
    credentials: Option<CredentialsFile>,
    http: Client,
    token: RwLock<Option<StoredToken>>,
}

impl AuthSession {
    /// Read `credentials.json` and `token.json` from the config directory.
    ///
    /// A missing file is not an error here; a missing credential only fails
    /// once a token is actually needed.
    pub fn load(paths: ConfigPaths) -> Result<Self> {
        let token_path = paths.token_file();
        let token = if token_path.exists() {
            let content = fs::read_to_string(&token_path)?;
            match serde_json::from_str::<StoredToken>(&content) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!("Ignoring unreadable token cache {:?}: {}", token_path, e);
                    None
                }
            }
        } else {
            None
        };

        let credentials_path = paths.credentials_file();
        let credentials = if credentials_path.exists() {
            let content = fs::read_to_string(&credentials_path)?;
            Some(serde_json::from_str::<CredentialsFile>(&content)?)
        } else {
            None
        };

        debug!(
            dir = %paths.dir.display(),
            cached_token = token.is_some(),
            credentials = credentials.is_some(),
            "loaded auth session"
        );

        Ok(Self {
            paths: Some(paths),
            credentials,
            http: Client::new(),
            token: RwLock::new(token),
        })
    }

    /// A session around a fixed access token. Nothing is read or persisted.
    pub fn with_access_token<S: Into<String>>(token: S) -> Self {
        Self {
            paths: None,
            credentials: None,
            http: Client::new(),
            token: RwLock::new(Some(StoredToken {
                token: token.into(),
                refresh_token: None,
                token_uri: None,
                client_id: None,
                client_secret: None,
                scopes: Vec::new(),
                expiry: None,
            })),
        }
    }

    /// Write the current token to `token.json` (owner read/write only).
    pub async fn save(&self) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let cached = self.token.read().await;
        let Some(token) = cached.as_ref() else {
            return Ok(());
        };

        paths.ensure_dir()?;
        let token_path = paths.token_file();
        fs::write(&token_path, serde_json::to_string_pretty(token)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&token_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&token_path, perms)?;
        }

        debug!("saved token cache to {:?}", token_path);
        Ok(())
    }

    /// Delete the cached token. Returns whether there was one.
    pub fn logout(paths: &ConfigPaths) -> Result<bool> {
        let token_path = paths.token_file();
        if token_path.exists() {
            fs::remove_file(&token_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Get a valid access token, refreshing or authorizing if necessary.
    pub async fn access_token(&self) -> Result<String> {
        // Check if we have a valid cached token
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(Utc::now()) {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        let new_token = self.obtain_token(cached.as_ref()).await?;
        let access = new_token.token.clone();
        // Only refreshable tokens are cached.
        let persist = new_token.refresh_token.is_some();
        *cached = Some(new_token);
        drop(cached);

        if persist {
            self.save().await?;
        }
        Ok(access)
    }

    async fn obtain_token(&self, current: Option<&StoredToken>) -> Result<StoredToken> {
        if let Some(current) = current.filter(|t| t.refresh_token.is_some()) {
            match self.refresh(current).await {
                Ok(token) => return Ok(token),
                Err(e) => warn!("Failed to refresh token: {}; re-authenticating", e),
            }
        }

        match &self.credentials {
            Some(CredentialsFile::ServiceAccount(account)) => {
                self.service_account_token(account).await
            }
            Some(CredentialsFile::Installed { installed: client })
            | Some(CredentialsFile::Web { web: client }) => {
                self.authorize_interactive(client).await
            }
            None => Err(self.setup_error()),
        }
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self, current: &StoredToken) -> Result<StoredToken> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| DriveError::TokenRefreshError("no refresh token".to_string()))?;
        let client = self.refresh_client(current)?;
        let token_uri = current
            .token_uri
            .clone()
            .or_else(|| client.token_uri.clone())
            .unwrap_or_else(|| TOKEN_URI.to_string());

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
        ];

        let response = self.http.post(&token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        info!("refreshed access token");
        Ok(StoredToken::from_response(
            token_response,
            Some(refresh_token),
            &token_uri,
            Some(&client),
        ))
    }

    /// Client id/secret for a refresh, from the cache or from `credentials.json`.
    fn refresh_client(&self, current: &StoredToken) -> Result<OAuthClientSecret> {
        if let (Some(id), Some(secret)) = (&current.client_id, &current.client_secret) {
            return Ok(OAuthClientSecret {
                client_id: id.clone(),
                client_secret: secret.clone(),
                auth_uri: None,
                token_uri: current.token_uri.clone(),
            });
        }
        match &self.credentials {
            Some(CredentialsFile::Installed { installed: client })
            | Some(CredentialsFile::Web { web: client }) => Ok(client.clone()),
            _ => Err(DriveError::TokenRefreshError(
                "token cache has no client id/secret".to_string(),
            )),
        }
    }

    /// Mint an access token with a signed JWT assertion.
    async fn service_account_token(
        &self,
        account: &ServiceAccountCredentials,
    ) -> Result<StoredToken> {
        let now = Utc::now().timestamp().max(0) as u64;
        let token_uri = account.token_uri.as_deref().unwrap_or(TOKEN_URI);

        let claims = Claims {
            iss: account.client_email.clone(),
            scope: SCOPES.join(" "),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600, // 1 hour
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let jwt = encode(&header, &claims, &key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];

        let response = self.http.post(token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(StoredToken::from_response(token_response, None, token_uri, None))
    }

    /// Ask the user to authorize in a browser and paste back the result.
    async fn authorize_interactive(&self, client: &OAuthClientSecret) -> Result<StoredToken> {
        let auth_uri = client.auth_uri.as_deref().unwrap_or(AUTH_URI);
        let token_uri = client.token_uri.as_deref().unwrap_or(TOKEN_URI);
        let url = authorization_url(auth_uri, &client.client_id)?;

        eprintln!("\n{}", "=".repeat(70));
        eprintln!("AUTHENTICATION REQUIRED");
        eprintln!("{}", "=".repeat(70));
        eprintln!("\nOpen this URL in your browser and approve access:\n");
        eprintln!("  {}\n", url);
        eprintln!("The browser then lands on a page that fails to load.");
        eprintln!("Paste that page's full URL (or just the code) here:");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let input = lines.next_line().await?.unwrap_or_default();
        let code = authorization_code(&input).ok_or_else(|| {
            DriveError::AuthenticationError("no authorization code entered".to_string())
        })?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", REDIRECT_URI),
        ];

        let response = self.http.post(token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        eprintln!("\nAuthentication successful! Credentials saved.\n");
        Ok(StoredToken::from_response(
            token_response,
            None,
            token_uri,
            Some(client),
        ))
    }

    fn setup_error(&self) -> DriveError {
        let location = self
            .paths
            .as_ref()
            .map(|p| p.credentials_file().display().to_string())
            .unwrap_or_else(|| "credentials.json".to_string());

        DriveError::AuthenticationError(format!(
            "no credentials found at {location}

To use gcmd, create OAuth credentials:
  1. https://console.cloud.google.com/apis/credentials
     Create an 'OAuth client ID' of type 'Desktop app'.
  2. Enable the Google Drive, Docs, and Sheets APIs for the project.
  3. Download the client JSON and save it as {location}
     (a service account key file works too).
  4. Run the command again."
        ))
    }
}

/// Consent URL for the installed-app flow.
pub fn authorization_url(auth_uri: &str, client_id: &str) -> Result<Url> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        auth_uri,
        &[
            ("client_id", client_id),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| DriveError::AuthenticationError(format!("invalid auth URI: {e}")))
}

/// Accept either the bare code or the redirected URL carrying `code=`.
pub fn authorization_code(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("code=") {
        let url = Url::parse(trimmed).ok()?;
        return url
            .query_pairs()
            .find(|(key, _)| *key == "code")
            .map(|(_, value)| value.into_owned());
    }
    Some(trimmed.to_string())
}
