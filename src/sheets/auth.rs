use crate::error::{AppError, Result};
use crate::sheets::client::AUTH_SCOPE;
use crate::sheets::token::{Token, TokenCache};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse, BasicTokenType,
    },
};
use reqwest::redirect::Policy;
use std::fs;
use std::io::{BufRead, BufReader, Stdin};
use std::path::Path;
use std::sync::Mutex;
use tiny_http::{Response, Server, StatusCode};
use tracing::{debug, instrument};
use tracing_indicatif::suspend_tracing_indicatif;
use url::Url;
use yup_oauth2::ApplicationSecret;

pub(crate) const GOOGLE_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Load the OAuth client secret downloaded from the Google Cloud console.
pub fn load_client_secret(path: &Path) -> Result<ApplicationSecret> {
    let contents = fs::read(path).map_err(|e| {
        AppError::Config(format!("Unable to read client secret file {:?}: {}", path, e))
    })?;

    yup_oauth2::parse_application_secret(contents).map_err(|e| {
        AppError::Config(format!("Unable to parse client secret file {:?}: {}", path, e))
    })
}

#[async_trait]
pub trait Authorizer {
    /// Obtain a fresh token from the user.
    async fn authorize(&self) -> Result<Token>;
}

/// Use the cached token when it can be read, otherwise ask the authorizer
/// for a new one and cache it.
#[instrument(name = "Acquiring token", skip_all)]
pub async fn acquire_token<A>(cache: &TokenCache, authorizer: &A) -> Result<Token>
where
    A: Authorizer + Sync + ?Sized,
{
    let token = match cache.load() {
        Ok(token) => {
            debug!("Using cached token");
            return Ok(token);
        }
        Err(e) => {
            debug!("No usable cached token ({}), authorizing...", e);
            authorizer.authorize().await?
        }
    };

    cache.save(&token)?;

    Ok(token)
}

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

enum CodeSource<R> {
    Console(Mutex<R>),
    Loopback { port: u16 },
}

/// Authorization-code flow driven by the user at the terminal.
pub struct InteractiveAuthorizer<R = BufReader<Stdin>> {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    source: CodeSource<R>,
}

impl InteractiveAuthorizer {
    pub fn stdin(secret: &ApplicationSecret) -> Result<Self> {
        Self::console(secret, BufReader::new(std::io::stdin()))
    }

    /// Catch the browser redirect on `127.0.0.1:<port>` instead of asking for
    /// the code to be pasted.
    pub fn loopback(secret: &ApplicationSecret, port: u16) -> Result<Self> {
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        Self::build(secret, redirect_uri, CodeSource::Loopback { port })
    }
}

impl<R: BufRead + Send> InteractiveAuthorizer<R> {
    /// Print the authorization URL and read the code from `reader`.
    pub fn console(secret: &ApplicationSecret, reader: R) -> Result<Self> {
        let redirect_uri = secret
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| GOOGLE_REDIRECT_URI.to_string());
        Self::build(secret, redirect_uri, CodeSource::Console(Mutex::new(reader)))
    }

    fn build(secret: &ApplicationSecret, redirect_uri: String, source: CodeSource<R>) -> Result<Self> {
        let auth_url = AuthUrl::new(secret.auth_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(redirect_uri)
            .map_err(|e| AppError::Config(format!("Invalid redirect URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(secret.client_id.clone()))
            .set_client_secret(ClientSecret::new(secret.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(AuthType::RequestBody);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            source,
        })
    }

    fn authorization_url(&self) -> (Url, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(AUTH_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        (url, csrf_token, pkce_verifier)
    }

    fn read_code(reader: &Mutex<R>) -> Result<AuthorizationCode> {
        let mut reader = reader
            .lock()
            .map_err(|_| AppError::Auth("Console reader is poisoned".to_string()))?;

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| AppError::Auth(format!("Unable to read authorization code: {}", e)))?;

        let code = line
            .split_whitespace()
            .next()
            .ok_or_else(|| AppError::Auth("No authorization code entered".to_string()))?;

        Ok(AuthorizationCode::new(code.to_string()))
    }
}

/// Bind the local server that receives the authorization redirect.
fn bind_callback(port: u16) -> Result<Server> {
    let bind_addr = format!("127.0.0.1:{}", port);
    Server::http(&bind_addr)
        .map_err(|e| AppError::Auth(format!("Failed to bind to {}: {}", bind_addr, e)))
}

/// Wait for one redirect on `server` and answer the browser before returning,
/// whether or not the callback carried a usable code.
fn receive_code(server: &Server, csrf_token: &CsrfToken) -> Result<AuthorizationCode> {
    let request = server
        .recv()
        .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

    let outcome = Url::parse(&format!("http://127.0.0.1{}", request.url()))
        .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))
        .and_then(|url| code_from_callback(&url, csrf_token));

    let response = match &outcome {
        Ok(_) => Response::from_string("Authentication successful! You can close this window."),
        Err(e) => Response::from_string(format!("Authentication failed: {}", e))
            .with_status_code(StatusCode(400)),
    };
    request
        .respond(response)
        .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;

    outcome
}

#[async_trait]
impl<R: BufRead + Send> Authorizer for InteractiveAuthorizer<R> {
    #[instrument(name = "Authorizing with Google", skip_all)]
    async fn authorize(&self) -> Result<Token> {
        let (auth_url, csrf_token, pkce_verifier) = self.authorization_url();

        let code = match &self.source {
            CodeSource::Console(reader) => suspend_tracing_indicatif(|| {
                println!(
                    "Go to the following link in your browser then type the authorization code:\n{}",
                    auth_url
                );
                Self::read_code(reader)
            })?,
            CodeSource::Loopback { port } => {
                let server = bind_callback(*port)?;
                suspend_tracing_indicatif(|| {
                    println!("Open this URL in your browser:\n{}", auth_url);
                    println!();
                    println!("Waiting for authorization...");
                    receive_code(&server, &csrf_token)
                })?
            }
        };

        let token_result = self
            .client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Unable to retrieve token from web: {:?}", e)))?;

        Ok(token_from_response(&token_result))
    }
}

fn code_from_callback(url: &Url, csrf_token: &CsrfToken) -> Result<AuthorizationCode> {
    if let Some((_, error)) = url.query_pairs().find(|(key, _)| key == "error") {
        return Err(AppError::Auth(format!("Authorization denied: {}", error)));
    }

    let (_, code) = url
        .query_pairs()
        .find(|(key, _)| key == "code")
        .ok_or_else(|| AppError::Auth("No code in callback".to_string()))?;

    let (_, state) = url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .ok_or_else(|| AppError::Auth("No state in callback".to_string()))?;

    if state.as_ref() != csrf_token.secret() {
        return Err(AppError::Auth("CSRF token mismatch".to_string()));
    }

    Ok(AuthorizationCode::new(code.into_owned()))
}

fn token_from_response(response: &BasicTokenResponse) -> Token {
    let token_type = match response.token_type() {
        BasicTokenType::Bearer => "Bearer".to_string(),
        BasicTokenType::Mac => "MAC".to_string(),
        BasicTokenType::Extension(other) => other.clone(),
    };

    Token {
        access_token: response.access_token().secret().clone(),
        token_type,
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        expiry: response
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64)),
    }
}
