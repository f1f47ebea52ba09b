//! Async HTTP fetcher wrapping reqwest.
//!
//! Each logical call runs a small retry state machine:
//! `Attempting -> Success`, `Attempting -> Retryable -> Attempting` while the
//! retry budget lasts, `Attempting -> Terminal`. Every attempt is bounded by
//! its own timeout. 5xx responses and transport errors are retried with a
//! linearly growing delay; 4xx responses fail immediately.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Retry budget for one class of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Per-attempt timeout.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Delay unit; retry `n` waits `n * backoff_step`.
    #[serde(with = "millis")]
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Structured API: more patience.
    pub fn api() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            backoff_step: Duration::from_secs(1),
        }
    }

    /// Public portals are best-effort.
    pub fn portal() -> Self {
        Self {
            max_retries: 1,
            timeout: Duration::from_secs(15),
            backoff_step: Duration::from_millis(500),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_step * retry
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Request description. Kept as data so each attempt can rebuild it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            url: url.into(),
            query: Vec::new(),
            form: None,
            json: None,
            headers: Vec::new(),
        }
    }

    pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: reqwest::Method::POST,
            form: Some(fields),
            ..Self::get(url)
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            json: Some(body),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// A successfully fetched response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects; relative links resolve against this.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Outcome of a single attempt.
enum Attempt {
    Success(FetchedPage),
    Retryable(FetchError),
    Terminal(FetchError),
}

/// HTTP fetcher bound to one retry policy.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(policy.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the request through the retry state machine.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let mut retries = 0u32;
        loop {
            match self.attempt(request).await {
                Attempt::Success(page) => return Ok(page),
                Attempt::Terminal(err) => {
                    tracing::debug!(url = %request.url, error = %err, "fetch failed terminally");
                    return Err(err);
                }
                Attempt::Retryable(err) => {
                    if retries >= self.policy.max_retries {
                        tracing::debug!(url = %request.url, attempts = retries + 1, error = %err, "fetch retries exhausted");
                        if self.policy.max_retries == 0 {
                            return Err(err);
                        }
                        return Err(FetchError::RetriesExhausted {
                            attempts: retries + 1,
                            last: Box::new(err),
                        });
                    }
                    retries += 1;
                    let delay = self.policy.backoff(retries);
                    tracing::debug!(url = %request.url, retry = retries, ?delay, error = %err, "retrying fetch");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, request: &FetchRequest) -> Attempt {
        let timeout = self.policy.timeout;
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let final_url = resp.url().to_string();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>((status, final_url, body))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Err(_elapsed) => Attempt::Retryable(FetchError::Timeout(timeout)),
            Ok(Err(e)) => Attempt::Retryable(FetchError::from_reqwest(&e, timeout)),
            Ok(Ok((status, _, _))) if status >= 500 => {
                Attempt::Retryable(FetchError::HttpStatus(status))
            }
            Ok(Ok((status, _, _))) if status >= 400 => {
                Attempt::Terminal(FetchError::HttpStatus(status))
            }
            Ok(Ok((status, final_url, body))) => Attempt::Success(FetchedPage {
                url: request.url.clone(),
                final_url,
                status,
                body,
            }),
        }
    }
}
