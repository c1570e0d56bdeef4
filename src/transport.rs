use crate::config::{Config, ConfigManager, NetworkConfig};
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Form fields for a POST, in submission order
pub type Form = Vec<(String, String)>;

/// Status code, headers and body of one catalog response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub code: u16,
    /// Header name to value; repeated headers are joined with `\n`
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    /// Split a raw HTTP response at the first blank line.
    pub fn parse(raw: &str) -> Self {
        let (head, body) = match (raw.find("\r\n\r\n"), raw.find("\n\n")) {
            (Some(crlf), Some(lf)) if lf < crlf => (&raw[..lf], &raw[lf + 2..]),
            (Some(crlf), _) => (&raw[..crlf], &raw[crlf + 4..]),
            (None, Some(lf)) => (&raw[..lf], &raw[lf + 2..]),
            (None, None) => (raw, ""),
        };

        let mut lines = head.lines();
        let code = lines
            .next()
            .and_then(|status| {
                let mut parts = status.split_whitespace();
                let protocol = parts.next()?;
                if !protocol.starts_with("HTTP/") {
                    return None;
                }
                parts.next()?.parse().ok()
            })
            .unwrap_or(0);

        let mut headers: HashMap<String, String> = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                Self::add_header(&mut headers, name.trim(), value.trim());
            }
        }

        Self {
            code,
            headers,
            body: body.to_string(),
        }
    }

    fn add_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
        headers
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One attempt at one catalog request.
///
/// Implementations own the cookie store; retrying is left to [`SessionTransport`].
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send(&self, url: &str, form: Option<&[(String, String)]>, timeout: Duration)
    -> Result<RawResponse>;
}

/// reqwest backend with a private cookie jar
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(user_agent: &str, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .cookie_provider(Arc::new(Jar::default()))
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::limited(10))
            .referer(true)
            .build()
            .map_err(ScrapeError::from)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(
        &self,
        url: &str,
        form: Option<&[(String, String)]>,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let request = match form {
            Some(fields) => self.client.post(url).form(fields),
            None => self.client.get(url),
        };
        let response = request.timeout(timeout).send().await?;

        let code = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                RawResponse::add_header(&mut headers, name.as_str(), value);
            }
        }
        let body = response.text().await?;

        Ok(RawResponse {
            code,
            headers,
            body,
        })
    }
}

/// Wait between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every failure, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(network: &NetworkConfig) -> Self {
        let initial = Duration::from_millis(network.retry_delay_ms);
        let backoff = if network.exponential_backoff {
            Backoff::Exponential {
                initial,
                max: Duration::from_millis(network.max_retry_delay_ms),
            }
        } else {
            Backoff::Fixed(initial)
        };
        Self {
            max_attempts: network.retry_attempts.max(1),
            backoff,
        }
    }

    /// Retry without waiting
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    /// Delay after the given number of failed attempts (starting at 1)
    pub fn delay_after(&self, failures: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { initial, max } => {
                let factor = 2_u32.saturating_pow(failures.saturating_sub(1));
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}

/// Request executor bound to one base URL and one cookie store.
///
/// An empty body or a transport error is retried with the same request
/// until the attempt budget runs out.
pub struct SessionTransport {
    backend: Box<dyn Backend>,
    base_url: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl SessionTransport {
    pub fn new(
        backend: Box<dyn Backend>,
        base_url: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            backend,
            base_url,
            retry,
            timeout,
        }
    }

    /// Transport over a fresh reqwest client and cookie jar
    pub fn http(config: &Config, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("webpac-scraper/{}", env!("CARGO_PKG_VERSION"));
        let backend = HttpBackend::new(&user_agent, config.server.accept_invalid_certs)?;
        Ok(Self::new(
            Box::new(backend),
            base_url,
            RetryPolicy::from_config(&config.network),
            ConfigManager::get_timeout_duration(config),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Full URL for a path suffix; a single leading `/` is dropped
    pub fn url_for(&self, path_suffix: &str) -> String {
        let suffix = path_suffix.strip_prefix('/').unwrap_or(path_suffix);
        format!("{}{}", self.base_url, suffix)
    }

    /// GET, or POST when `form` is given, with retries
    pub async fn execute(
        &self,
        path_suffix: &str,
        form: Option<&[(String, String)]>,
    ) -> Result<RawResponse> {
        self.execute_with_timeout(path_suffix, form, self.timeout)
            .await
    }

    pub async fn execute_with_timeout(
        &self,
        path_suffix: &str,
        form: Option<&[(String, String)]>,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let url = self.url_for(path_suffix);
        let attempts = self.retry.max_attempts;

        for attempt in 1..=attempts {
            debug!(url = %url, attempt, post = form.is_some(), "catalog request");
            match self.backend.send(&url, form, timeout).await {
                Ok(response) if !response.body.is_empty() => return Ok(response),
                Ok(response) => {
                    warn!(url = %url, attempt, code = response.code, "empty response from catalog");
                }
                Err(error) => {
                    warn!(url = %url, attempt, error = %error, "catalog request failed");
                }
            }

            if attempt < attempts {
                let delay = self.retry.delay_after(attempt);
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }

        Err(ScrapeError::Unreachable { url, attempts })
    }

    /// Single attempt, whatever the outcome
    pub async fn execute_once(
        &self,
        path_suffix: &str,
        form: Option<&[(String, String)]>,
    ) -> Result<RawResponse> {
        let url = self.url_for(path_suffix);
        debug!(url = %url, post = form.is_some(), "catalog request (single attempt)");
        self.backend.send(&url, form, self.timeout).await
    }
}
