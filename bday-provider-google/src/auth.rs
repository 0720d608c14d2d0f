//! OAuth session management for the Google Calendar API.
//!
//! First run: opens the consent URL in a browser, waits for the redirect on
//! a local port, exchanges the code for tokens and stores them. Later runs
//! reuse the stored refresh token and only hit the token endpoint when the
//! access token has expired.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `~/.config/bday` (or the platform equivalent).
pub fn base_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("bday"))
}

fn secret_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("google_secret.json"))
}

fn token_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("google_token.toml"))
}

/// The "installed application" client secret file downloaded from the
/// Google Cloud console.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: ClientSecret,
}

#[derive(Deserialize, Clone)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

fn load_client_secret() -> Result<ClientSecret> {
    let path = secret_path()?;
    if !path.exists() {
        bail!(
            "Google client secret not found at '{}'.\n\
             Download an OAuth client secret (application type: desktop) from the\n\
             Google Cloud console and save it there to authorize bday.",
            path.display()
        );
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let file: ClientSecretFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;
    Ok(file.installed)
}

#[derive(Serialize, Deserialize, Clone)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredTokens {
    fn load() -> Result<Option<StoredTokens>> {
        let path = token_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token file '{}'", path.display()))?;
        let tokens = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse token file '{}'", path.display()))?;
        Ok(Some(tokens))
    }

    fn save(&self) -> Result<()> {
        let path = token_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create '{}'", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize tokens")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on '{}'", path.display()))?;
        }

        Ok(())
    }

    fn is_expired(&self) -> bool {
        // A small margin so a token does not expire mid-request
        Utc::now() + Duration::seconds(30) >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
}

/// Produce a valid access token, running the consent flow or refreshing the
/// stored token as needed.
pub async fn access_token(oauth_port: u16) -> Result<String> {
    let tokens = match StoredTokens::load()? {
        Some(tokens) if !tokens.is_expired() => tokens,
        Some(tokens) => refresh(tokens).await?,
        None => authorize(oauth_port).await?,
    };
    Ok(tokens.access_token)
}

async fn refresh(tokens: StoredTokens) -> Result<StoredTokens> {
    let secret = load_client_secret()?;
    let client = reqwest::Client::new();

    let response = client
        .post(TOKEN_URL)
        .form(&[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("refresh_token", tokens.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .context("Failed to send token refresh request")?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Token refresh failed: {}", body);
    }
    let refreshed: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token refresh response")?;

    let tokens = StoredTokens {
        access_token: refreshed.access_token,
        // Google usually omits the refresh token here, keep the stored one
        refresh_token: if refreshed.refresh_token.is_empty() {
            tokens.refresh_token
        } else {
            refreshed.refresh_token
        },
        expires_at: Utc::now() + Duration::seconds(refreshed.expires_in),
    };
    tokens.save()?;
    Ok(tokens)
}

/// Run the full installed-app consent flow.
async fn authorize(oauth_port: u16) -> Result<StoredTokens> {
    let secret = load_client_secret()?;
    let redirect_uri = format!("http://localhost:{}/", oauth_port);

    let mut auth_url = url::Url::parse(AUTH_URL).expect("static URL parses");
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    eprintln!("\nOpen this URL in your browser to authorize bday:\n");
    eprintln!("{}\n", auth_url);
    if open::that(auth_url.as_str()).is_err() {
        eprintln!("(Could not open the browser automatically, please copy the URL above)");
    }

    let code = wait_for_callback(oauth_port)?;
    eprintln!("\nReceived authorization code, exchanging for tokens...");

    let client = reqwest::Client::new();
    let response = client
        .post(TOKEN_URL)
        .form(&[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("Failed to exchange authorization code for tokens")?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Code exchange failed: {}", body);
    }
    let granted: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;
    if granted.refresh_token.is_empty() {
        bail!("Google did not return a refresh token; revoke access and authorize again");
    }

    let tokens = StoredTokens {
        access_token: granted.access_token,
        refresh_token: granted.refresh_token,
        expires_at: Utc::now() + Duration::seconds(granted.expires_in),
    };
    tokens.save()?;
    eprintln!("Authorization successful, tokens stored.");
    Ok(tokens)
}

/// Serve one request on the local redirect port and pull the `code`
/// parameter out of it.
fn wait_for_callback(port: u16) -> Result<String> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .with_context(|| format!("Failed to bind to port {}", port))?;

    eprintln!("Waiting for the OAuth callback on port {}...", port);

    let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let url_part = request_line
        .split_whitespace()
        .nth(1)
        .context("Invalid callback request")?;
    let url = url::Url::parse(&format!("http://localhost{}", url_part))?;
    let code = url
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.to_string())
        .context("No code in callback")?;

    let response = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body>\
        <h1>Authorization successful!</h1>\
        <p>You can close this window and return to the terminal.</p>\
        </body></html>";
    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    Ok(code)
}
