//! HTTP collaborator for docbind.
//!
//! The engine only talks to the [`HttpClient`] trait: a blocking `GET` that
//! returns the status and body of a response. [`RestClient`] is the default
//! implementation and provides:
//!
//! - a `reqwest` client with an `Accept` header, User-Agent and 30 second timeout
//! - an optional bearer token from `DOCBIND_API_TOKEN`
//! - a validated base URL from `DOCBIND_API_BASE`, used to join relative
//!   finder templates
//!
//! # Example
//!
//! ```ignore
//! use docbind_api::{HttpClient, RestClient};
//!
//! fn main() -> anyhow::Result<()> {
//!     let client = RestClient::from_env()?;
//!     let response = client.get(&client.resolve_url("/person/Babs")?)?;
//!     println!("status: {}", response.status);
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use docbind_util::{RuntimeError, block_on};
use reqwest::{Client, header};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Environment variable holding the base URL for relative finder templates.
pub const API_BASE_ENV: &str = "DOCBIND_API_BASE";
/// Environment variable holding an optional bearer token.
pub const API_TOKEN_ENV: &str = "DOCBIND_API_TOKEN";

const DEFAULT_ACCEPT: &str = "application/xml, application/json;q=0.9, */*;q=0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures raised by the HTTP collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned HTTP {actual}, expected {expected}")]
    UnexpectedStatus { url: String, expected: u16, actual: u16 },
    #[error("cannot build a URL from '{input}': {message}")]
    InvalidUrl { input: String, message: String },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails unless the response carries exactly `status`.
    pub fn expect_status(&self, status: u16) -> Result<&Self, TransportError> {
        if self.status == status {
            Ok(self)
        } else {
            Err(TransportError::UnexpectedStatus {
                url: self.url.clone(),
                expected: status,
                actual: self.status,
            })
        }
    }
}

/// Blocking GET transport used by the model manager.
pub trait HttpClient {
    /// Issues a GET and returns the response whatever its status.
    fn get(&self, url: &str) -> Result<Response, TransportError>;

    /// Turns a finder URL into the URL actually fetched.
    ///
    /// The default leaves the URL untouched.
    fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        Ok(url.to_string())
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str) -> Result<Response, TransportError> {
        (**self).get(url)
    }

    fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        (**self).resolve_url(url)
    }
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client`.
///
/// Requests are driven to completion synchronously; absolute URLs are fetched
/// as given and relative ones are joined onto `base_url`.
pub struct RestClient {
    pub base_url: Option<String>,
    pub http: Client,
    pub user_agent: String,
}

impl RestClient {
    /// Builds a client with an optional base URL and bearer token.
    pub fn new(base_url: Option<&str>, api_token: Option<&str>) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        if let Some(api_token) = api_token {
            let authorization_header_value = format!("Bearer {}", api_token);
            default_headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&authorization_header_value).context("API token is not a valid header value")?,
            );
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static(DEFAULT_ACCEPT));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;

        if let Some(base) = base_url {
            validate_base_url(base)?;
        }
        Ok(Self {
            base_url: base_url.map(|base| base.trim_end_matches('/').to_string()),
            http,
            user_agent: format!("docbind/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Builds a client from `DOCBIND_API_BASE` and `DOCBIND_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(API_BASE_ENV).ok().filter(|value| !value.trim().is_empty());
        let api_token = env::var(API_TOKEN_ENV).ok().filter(|value| !value.trim().is_empty());
        Self::new(base_url.as_deref(), api_token.as_deref())
    }

    async fn fetch(http: Client, user_agent: String, url: String) -> Result<Response, TransportError> {
        let request_error = |err: reqwest::Error| TransportError::Request {
            url: url.clone(),
            message: err.to_string(),
        };
        let resp = http
            .get(&url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(request_error)?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(request_error)?;
        Ok(Response::new(final_url, status, body))
    }
}

impl HttpClient for RestClient {
    fn get(&self, url: &str) -> Result<Response, TransportError> {
        debug!(%url, "fetching");
        let response = block_on(Self::fetch(self.http.clone(), self.user_agent.clone(), url.to_string()))??;
        if response.is_success() {
            debug!(url = %response.url, status = response.status, bytes = response.body.len(), "fetched");
        } else {
            warn!(url = %response.url, status = response.status, "non-success response");
        }
        Ok(response)
    }

    fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        if Url::parse(url).is_ok() {
            return Ok(url.to_string());
        }
        let Some(base) = &self.base_url else {
            return Err(TransportError::InvalidUrl {
                input: url.to_string(),
                message: format!("relative URL needs {API_BASE_ENV} to be set"),
            });
        };
        let joined = if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        };
        Url::parse(&joined)
            .map(|parsed| parsed.to_string())
            .map_err(|err| TransportError::InvalidUrl {
                input: url.to_string(),
                message: err.to_string(),
            })
    }
}

/// Validate that a base URL is usable for joining relative finder URLs.
///
/// Rules:
/// - scheme must be `http` or `https`
/// - a host is required
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid {} URL '{}': {}", API_BASE_ENV, base, e))?;

    if !matches!(parsed_base_url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "{} must use http or https; got '{}://'",
            API_BASE_ENV,
            parsed_base_url.scheme()
        ));
    }
    if parsed_base_url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("{} must include a host", API_BASE_ENV));
    }
    Ok(())
}
