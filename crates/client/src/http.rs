use std::time::Duration;

use gracli_core::config::ClientConfig;
use gracli_core::error::{GracliError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

const BACKOFF_MAX: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Limit on each socket read, reset after every successful read.
    pub read_timeout: Duration,
    /// Retries after the first attempt, transport failures only.
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for HttpConfig {
    fn from(cfg: &ClientConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout,
            read_timeout: cfg.read_timeout,
            max_retries: cfg.max_retries,
            backoff_factor: cfg.backoff_factor,
            headers: cfg.headers.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GracliError::BadResponse {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| GracliError::Parse(format!("response is not valid JSON: {e}")))
    }
}

/// Pooled HTTP client with fixed timeouts and retries of idempotent
/// requests on transport failures.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    headers: HeaderMap,
    max_retries: u32,
    backoff_factor: f64,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .read_timeout(cfg.read_timeout)
            .build()
            .map_err(|e| GracliError::Http(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            headers: build_http_headers(&cfg.headers),
            max_retries: cfg.max_retries,
            backoff_factor: cfg.backoff_factor,
        })
    }

    /// Execute a request and return whatever status the server answered with.
    pub async fn perform(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse> {
        self.perform_with_form(method, url, params, None).await
    }

    /// Like [`HttpClient::perform`], sending `form` as an urlencoded body.
    pub async fn perform_with_form(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        form: Option<&[(&str, String)]>,
    ) -> Result<HttpResponse> {
        let retryable = is_idempotent(&method);
        let mut retry = 0;
        loop {
            match self.send_once(method.clone(), url, params, form).await {
                Ok(resp) => return Ok(resp),
                Err(err) if retryable && is_transient(&err) && retry < self.max_retries => {
                    retry += 1;
                    let delay = backoff_delay(self.backoff_factor, retry);
                    tracing::warn!(
                        url = %url,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient http failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(GracliError::Http(format!("{method} {url} failed: {err}")));
                }
            }
        }
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        form: Option<&[(&str, String)]>,
        raise_for_status: bool,
    ) -> Result<HttpResponse> {
        let resp = self.perform_with_form(method, url, params, form).await?;
        if raise_for_status {
            resp.error_for_status()
        } else {
            Ok(resp)
        }
    }

    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse> {
        self.request(Method::GET, url, params, None, true).await
    }

    /// POST is not idempotent, so transport failures are never retried.
    pub async fn post(
        &self,
        url: &str,
        params: &[(&str, String)],
        form: &[(&str, String)],
    ) -> Result<HttpResponse> {
        self.request(Method::POST, url, params, Some(form), true).await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        form: Option<&[(&str, String)]>,
    ) -> std::result::Result<HttpResponse, reqwest::Error> {
        let mut req = self
            .client
            .request(method, url)
            .headers(self.headers.clone())
            .query(params);
        if let Some(form) = form {
            req = req.form(form);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Delay before the `retry`-th retry (1-based). The first retry is
/// immediate, later ones back off exponentially up to [`BACKOFF_MAX`].
pub fn backoff_delay(backoff_factor: f64, retry: u32) -> Duration {
    if retry <= 1 || backoff_factor <= 0.0 {
        return Duration::ZERO;
    }
    let exp = (retry - 1).min(32) as i32;
    let secs = backoff_factor * 2f64.powi(exp);
    Duration::try_from_secs_f64(secs)
        .map(|d| d.min(BACKOFF_MAX))
        .unwrap_or(BACKOFF_MAX)
}

fn is_idempotent(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::OPTIONS,
        Method::PUT,
        Method::DELETE,
        Method::TRACE,
    ]
    .contains(method)
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
}

fn build_http_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::try_from(k.as_str());
        let value = HeaderValue::try_from(v.as_str());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                out.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %k, "ignored invalid http header");
            }
        }
    }
    out
}
