//! OAuth 2.0 installed-application flow.
//!
//! The user authorizes in a browser, Google redirects to a one-shot
//! loopback listener with an authorization code, and the code is
//! exchanged for tokens at the client's token endpoint. PKCE (S256)
//! and a random `state` value guard the exchange.

use crate::{
    error::{ApiError, ApiResult},
    secrets::ClientSecrets,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration as IoTimeout;

pub const YOUTUBE_READONLY: &str = "https://www.googleapis.com/auth/youtube.readonly";

const SUCCESS_PAGE: &str =
    "The authentication flow has completed. You may close this window.";

/// Tokens are treated as expired this long before their stated expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Connections without a code (favicon requests, preconnects that never
/// send anything) tolerated before the listener gives up.
const MAX_REDIRECT_ATTEMPTS: usize = 8;

/// A connection that stays silent this long is dropped.
const REDIRECT_READ_TIMEOUT: IoTimeout = IoTimeout::from_secs(10);

// ── Credentials ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token:  String,
    pub token_type:    String,
    pub refresh_token: Option<String>,
    pub scopes:        Vec<String>,
    pub expires_at:    Option<DateTime<Utc>>,
}

impl Credentials {
    /// Bearer credentials with no expiry, e.g. a token minted elsewhere.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token:  access_token.into(),
            token_type:    "Bearer".into(),
            refresh_token: None,
            scopes:        Vec::new(),
            expires_at:    None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= at,
            None     => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token:  String,
    #[serde(default = "default_token_type")]
    token_type:    String,
    expires_in:    Option<i64>,
    refresh_token: Option<String>,
    scope:         Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error:             String,
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_credentials(self, requested: &[String], now: DateTime<Utc>) -> Credentials {
        let scopes = match self.scope {
            Some(s) => s.split_whitespace().map(str::to_string).collect(),
            None    => requested.to_vec(),
        };
        Credentials {
            access_token:  self.access_token,
            token_type:    self.token_type,
            refresh_token: self.refresh_token,
            scopes,
            expires_at:    self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

// ── PKCE ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier:  String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }
}

// ── Redirect parsing ─────────────────────────────────────────────────────────

/// Query parameters of the loopback redirect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RedirectParams {
    pub code:  Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Parse an HTTP request line such as `GET /?code=x&state=y HTTP/1.1`.
pub fn parse_redirect(request_line: &str) -> ApiResult<RedirectParams> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ApiError::OAuth(format!("malformed request line: {request_line:?}")))?;

    let url = Url::parse(&format!("http://localhost{target}")).map_err(|e| {
        ApiError::InvalidUrl { url: target.to_string(), reason: e.to_string() }
    })?;

    let mut params = RedirectParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code"  => params.code  = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(params)
}

// ── Flow ─────────────────────────────────────────────────────────────────────

pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scopes:  Vec<String>,
    state:   String,
    pkce:    Pkce,
    http:    reqwest::blocking::Client,
}

impl InstalledAppFlow {
    pub fn from_client_secrets_file(path: impl AsRef<Path>, scopes: &[&str]) -> ApiResult<Self> {
        Ok(Self::new(ClientSecrets::from_file(path)?, scopes))
    }

    pub fn new(secrets: ClientSecrets, scopes: &[&str]) -> Self {
        Self {
            secrets,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            state:  uuid::Uuid::new_v4().simple().to_string(),
            pkce:   Pkce::generate(),
            http:   reqwest::blocking::Client::new(),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The URL the user must visit to grant access.
    pub fn authorization_url(&self, redirect_uri: &str) -> ApiResult<String> {
        let auth_uri = &self.secrets.config.auth_uri;
        let scope = self.scopes.join(" ");
        let url = Url::parse_with_params(
            auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secrets.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", self.state.as_str()),
                ("code_challenge", self.pkce.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| ApiError::InvalidUrl { url: auth_uri.clone(), reason: e.to_string() })?;
        Ok(url.into())
    }

    /// Listen on 127.0.0.1:`port` (0 picks a free port), send the user
    /// to the consent page, and trade the returned code for credentials.
    ///
    /// `on_auth_url` receives the consent URL before the browser is
    /// launched, so callers can show it when no browser is available.
    pub fn run_local_server(
        &self,
        port: u16,
        on_auth_url: impl FnOnce(&str),
    ) -> ApiResult<Credentials> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}/");
        let auth_url = self.authorization_url(&redirect_uri)?;

        log::info!("oauth: waiting for redirect on {redirect_uri}");
        on_auth_url(&auth_url);
        if let Err(e) = open::that(&auth_url) {
            log::warn!("oauth: could not open a browser: {e}");
        }

        let code = self.wait_for_code(&listener)?;
        log::debug!("oauth: authorization code received on port {port}");
        self.exchange_code(&code, &redirect_uri)
    }

    fn wait_for_code(&self, listener: &TcpListener) -> ApiResult<String> {
        for _ in 0..MAX_REDIRECT_ATTEMPTS {
            let (mut stream, peer) = listener.accept()?;
            stream.set_read_timeout(Some(REDIRECT_READ_TIMEOUT))?;

            let mut request_line = String::new();
            if let Err(e) = BufReader::new(&stream).read_line(&mut request_line) {
                log::debug!("oauth: dropping connection from {peer}: {e}");
                continue;
            }

            let params = match parse_redirect(&request_line) {
                Ok(params) => params,
                Err(e) => {
                    log::debug!("oauth: ignoring request from {peer}: {e}");
                    // The peer may already be gone.
                    let _ = write_response(&mut stream, "400 Bad Request", "Bad request.");
                    continue;
                }
            };
            if params.code.is_none() && params.error.is_none() {
                let _ = write_response(&mut stream, "404 Not Found", "Not found.");
                continue;
            }
            write_response(&mut stream, "200 OK", SUCCESS_PAGE)?;
            return self.check_redirect(params);
        }
        Err(ApiError::OAuth("no authorization code received".into()))
    }

    /// Validate redirect parameters and return the authorization code.
    pub fn check_redirect(&self, params: RedirectParams) -> ApiResult<String> {
        if let Some(error) = params.error {
            return Err(ApiError::OAuth(format!("authorization denied: {error}")));
        }
        if params.state.as_deref() != Some(self.state.as_str()) {
            return Err(ApiError::OAuth("state mismatch in redirect".into()));
        }
        params
            .code
            .ok_or_else(|| ApiError::OAuth("redirect carried no code".into()))
    }

    pub fn exchange_code(&self, code: &str, redirect_uri: &str) -> ApiResult<Credentials> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.secrets.config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", self.pkce.verifier.as_str()),
        ];
        if let Some(secret) = &self.secrets.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let creds = self.token_request(&form)?;
        log::info!("oauth: access token obtained (scopes={})", creds.scopes.join(" "));
        Ok(creds)
    }

    /// Use the refresh token to mint a new access token.
    pub fn refresh(&self, creds: &Credentials) -> ApiResult<Credentials> {
        let refresh_token = creds
            .refresh_token
            .as_deref()
            .ok_or_else(|| ApiError::OAuth("credentials carry no refresh token".into()))?;

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.secrets.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let mut fresh = self.token_request(&form)?;
        // Google omits the refresh token on refresh grants.
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = creds.refresh_token.clone();
        }
        Ok(fresh)
    }

    fn token_request(&self, form: &[(&str, &str)]) -> ApiResult<Credentials> {
        let response = self
            .http
            .post(&self.secrets.config.token_uri)
            .form(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let error = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(d) => format!("{}: {d}", e.error),
                    None    => e.error,
                },
                Err(_) => body,
            };
            return Err(ApiError::Token { status: status.as_u16(), error });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_credentials(&self.scopes, Utc::now()))
    }
}

fn write_response(stream: &mut impl Write, status: &str, body: &str) -> ApiResult<()> {
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_challenge_matches_rfc7636_example() {
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".into());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn generated_verifier_has_valid_length() {
        let pkce = Pkce::generate();
        assert!((43..=128).contains(&pkce.verifier.len()));
        assert!(!pkce.challenge.contains('='));
    }

    #[test]
    fn parses_redirect_request_line() {
        let p = parse_redirect("GET /?state=abc&code=4%2F0Ab&scope=x HTTP/1.1\r\n").unwrap();
        assert_eq!(p.code.as_deref(), Some("4/0Ab"));
        assert_eq!(p.state.as_deref(), Some("abc"));
        assert_eq!(p.error, None);

        let p = parse_redirect("GET /favicon.ico HTTP/1.1").unwrap();
        assert_eq!(p, RedirectParams::default());

        assert!(parse_redirect("").is_err());
    }

    fn flow() -> InstalledAppFlow {
        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "c"}}"#).unwrap();
        InstalledAppFlow::new(secrets, &[YOUTUBE_READONLY])
    }

    /// Sends `request` (if any) on a fresh connection and returns the reply.
    fn send(addr: std::net::SocketAddr, request: Option<&str>) -> String {
        use std::io::Read;
        let mut stream = std::net::TcpStream::connect(addr).unwrap();
        let Some(request) = request else { return String::new() };
        stream.write_all(request.as_bytes()).unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).unwrap();
        reply
    }

    #[test]
    fn listener_survives_empty_and_garbled_connections() {
        let flow = flow();
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let redirect = format!("GET /?code=abc&state={} HTTP/1.1\r\n", flow.state());

        let client = std::thread::spawn(move || {
            // Connect and hang up without sending a request line.
            send(addr, None);
            let garbled = send(addr, Some("\r\n"));
            let favicon = send(addr, Some("GET /favicon.ico HTTP/1.1\r\n"));
            let done = send(addr, Some(&redirect));
            (garbled, favicon, done)
        });

        assert_eq!(flow.wait_for_code(&listener).unwrap(), "abc");
        let (garbled, favicon, done) = client.join().unwrap();
        assert!(garbled.starts_with("HTTP/1.1 400"));
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(done.starts_with("HTTP/1.1 200"));
        assert!(done.ends_with(SUCCESS_PAGE));
    }

    #[test]
    fn listener_gives_up_after_repeated_non_redirects() {
        let flow = flow();
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            for _ in 0..MAX_REDIRECT_ATTEMPTS {
                send(addr, None);
            }
        });

        assert!(matches!(flow.wait_for_code(&listener), Err(ApiError::OAuth(_))));
        client.join().unwrap();
    }

    #[test]
    fn expiry_honours_skew() {
        let now = Utc::now();
        let mut creds = Credentials::bearer("t");
        assert!(!creds.is_expired(now));

        creds.expires_at = Some(now + Duration::seconds(30));
        assert!(creds.is_expired(now));

        creds.expires_at = Some(now + Duration::seconds(3600));
        assert!(!creds.is_expired(now));
    }
}
