//! OAuth 2.0 against Google's authorization server.
//!
//! This module runs the interactive consent flow (browser plus a one-shot local redirect
//! server) and exchanges refresh tokens. Client credentials come from the Google client secrets
//! file named in the configuration. That file is only read when one of those two operations
//! actually needs it, so a still-valid stored credential works even if the secrets file has
//! been moved away.

use crate::auth::Authorizer;
use crate::credentials::Credential;
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use jiff::Timestamp;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenUrl,
};
use oauth2::{EndpointNotSet, EndpointSet, reqwest};
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const OAUTH_DONE: &str = include_str!("../oauth_done.html");

/// The subset of a Google client secrets file that the flows need.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google wraps the secrets in an `installed` or `web` object depending on the client type.
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClientSecretsFile {
    Installed(ClientSecrets),
    Web(ClientSecrets),
}

impl ClientSecrets {
    pub fn parse(raw: &str) -> eyre::Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(raw)
            .context("expected an object with an `installed` or `web` client")?;
        Ok(match file {
            ClientSecretsFile::Installed(secrets) | ClientSecretsFile::Web(secrets) => secrets,
        })
    }

    pub async fn from_file(path: &Path) -> eyre::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read client secrets file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse client secrets file {}", path.display()))
    }
}

type TokenClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Runs OAuth flows for the YouTube Data API.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_secrets_file: PathBuf,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OAuthManager {
    /// Creates a manager that reads its client credentials from `client_secrets_file`.
    pub fn new(
        client_secrets_file: impl Into<PathBuf>,
        scopes: Vec<String>,
        timeout: Duration,
    ) -> eyre::Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .context("build OAuth HTTP client")?;
        Ok(Self {
            client_secrets_file: client_secrets_file.into(),
            scopes,
            http_client,
        })
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    async fn client(&self) -> eyre::Result<(ClientSecrets, TokenClient)> {
        let secrets = ClientSecrets::from_file(&self.client_secrets_file).await?;
        let token_url = TokenUrl::new(secrets.token_uri.clone()).context("parse token_uri")?;
        let auth_url = AuthUrl::new(secrets.auth_uri.clone()).context("parse auth_uri")?;
        let mut client = BasicClient::new(ClientId::new(secrets.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);
        if let Some(secret) = &secrets.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }
        Ok((secrets, client))
    }

    /// Walks the user through the browser consent screen and returns the granted credential.
    ///
    /// A local HTTP server is bound to an ephemeral port on the loopback interface to receive
    /// the redirect. Consent is always requested explicitly (`prompt=consent`) together with
    /// offline access so that Google hands out a refresh token every time.
    pub async fn authenticate(&self) -> eyre::Result<Credential> {
        let (_, client) = self.client().await?;

        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;
        let client = client.set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // The flow runs exactly once, so the CSRF token is never re-used.
            .authorize_url(move || csrf.clone())
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        eprintln!("Please visit this URL to authorize this application: {auth_url}");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            // The URL was printed above, the user can still open it by hand.
            tracing::warn!("could not open browser: {e}");
        }

        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("exchange authorization code with access token")?;

        Ok(Credential::from_token_response(
            &token,
            &self.scopes,
            Timestamp::now(),
        ))
    }

    /// Exchanges the refresh token of `credential` for a new access token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_credential))` - refresh succeeded
    /// * `Ok(None)` - there is no refresh token, or the server rejected it as an invalid grant
    /// * `Err(_)` - network or other error occurred during the exchange
    pub async fn refresh_token(&self, credential: &Credential) -> eyre::Result<Option<Credential>> {
        let Some(refresh_token) = &credential.refresh_token else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");
        let (_, client) = self.client().await?;
        let refresh_token = RefreshToken::new(refresh_token.clone());

        match client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http_client)
            .await
        {
            Ok(token) => {
                tracing::debug!("successfully refreshed OAuth token");
                let fresh = Credential::from_token_response(&token, &self.scopes, Timestamp::now());
                Ok(Some(credential.refreshed_with(fresh)))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    /// Binds the one-shot redirect server.
    ///
    /// Returns the redirect URL to hand to Google and a future that resolves to the
    /// authorization code once the browser comes back with a matching `state`.
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to localhost")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        tracing::debug!(%addr, "listening for OAuth redirect");

        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move { handle_redirect(req, &csrf, got).await }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    outcome = gotten.recv() => {
                        serve.as_mut().graceful_shutdown();
                        // Let the browser receive the response page before dropping the connection.
                        let _ = serve.await;
                        outcome.ok_or_else(|| eyre::eyre!("redirect handler dropped"))?
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}

/// Handles the single request Google's redirect makes to the local server.
async fn handle_redirect(
    req: Request<body::Incoming>,
    csrf: &CsrfToken,
    got: tokio::sync::mpsc::Sender<eyre::Result<AuthorizationCode>>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let outcome = parse_redirect_query(req.uri().query().unwrap_or(""), csrf);
    let page = match &outcome {
        Ok(_) => OAUTH_DONE.to_string(),
        Err(e) => format!("Authorization failed: {e}. You may close this tab and try again."),
    };
    // Only the first outcome matters, the receiver stops listening after it.
    let _ = got.send(outcome).await;
    Ok(Response::new(Full::<Bytes>::from(page)))
}

/// Extracts the authorization code from the redirect's query string.
fn parse_redirect_query(query: &str, csrf: &CsrfToken) -> eyre::Result<AuthorizationCode> {
    let mut presented_state = None;
    let mut presented_code = None;
    let mut presented_error = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => presented_state = Some(v),
            "code" => presented_code = Some(v),
            "error" => presented_error = Some(v),
            _ => {}
        }
    }
    if presented_state.as_deref() != Some(csrf.secret().as_str()) {
        eyre::bail!("invalid csrf token");
    }
    if let Some(error) = presented_error {
        eyre::bail!("authorization was not granted: {error}");
    }
    let Some(code) = presented_code else {
        eyre::bail!("no authorization code found");
    };
    Ok(AuthorizationCode::new(code.into_owned()))
}

impl Authorizer for OAuthManager {
    async fn refresh(&self, credential: &Credential) -> eyre::Result<Option<Credential>> {
        self.refresh_token(credential).await
    }

    async fn consent(&self) -> eyre::Result<Credential> {
        self.authenticate().await
    }
}
