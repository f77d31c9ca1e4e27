//! Retrying HTTP accessor shared by every source adapter.
//!
//! Each attempt is bounded by `timeout_ms`. Transport failures and statuses
//! `>= 400` are retried until `max_attempts` is reached, sleeping a uniformly
//! random delay in `[retry_delay_min_ms, retry_delay_max_ms]` between attempts.
//! There is no cache: every call is a live request.

use std::time::Duration;

use rand::Rng as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";
const DEFAULT_ENCODING: &str = "utf-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout, covering connect and body.
    pub timeout_ms: u64,
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,
    /// Fixed pause before every request.
    pub request_delay_ms: u64,
    pub user_agent: String,
    pub accept: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 3,
            retry_delay_min_ms: 1_000,
            retry_delay_max_ms: 3_000,
            request_delay_ms: 0,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept: DEFAULT_ACCEPT.to_owned(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_ms must be > 0".to_owned(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_attempts must be >= 1".to_owned(),
            ));
        }
        if self.retry_delay_min_ms > self.retry_delay_max_ms {
            return Err(ConfigError::Validation(format!(
                "fetch.retry_delay_min_ms ({}) must not exceed fetch.retry_delay_max_ms ({})",
                self.retry_delay_min_ms, self.retry_delay_max_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url}: HTTP {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("GET {url}: request failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid header value for {name}: {value:?}")]
    Header { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub body: String,
    /// Charset label the body was decoded with.
    pub encoding: String,
}

#[derive(Debug)]
enum AttemptFailure {
    Status(u16),
    Transport(reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("user-agent", &config.user_agent)?);
        headers.insert(ACCEPT, header_value("accept", &config.accept)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, config })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.config.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
            }

            let failure = match self.fetch_once(url).await {
                Ok(page) => {
                    tracing::debug!(url = %url, attempt, encoding = %page.encoding, "fetched");
                    return Ok(page);
                }
                Err(failure) => failure,
            };

            if attempt >= max_attempts {
                tracing::warn!(url = %url, attempt, ?failure, "fetch failed; giving up");
                return Err(match failure {
                    AttemptFailure::Status(status) => FetchError::Status {
                        url: url.to_string(),
                        status,
                        attempts: attempt,
                    },
                    AttemptFailure::Transport(source) => FetchError::Transport {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    },
                });
            }

            let delay = self.retry_delay();
            tracing::debug!(url = %url, attempt, ?failure, ?delay, "fetch failed; retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, AttemptFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(AttemptFailure::Transport)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(AttemptFailure::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or_else(|| DEFAULT_ENCODING.to_owned());
        let body = response
            .text_with_charset(DEFAULT_ENCODING)
            .await
            .map_err(AttemptFailure::Transport)?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            encoding,
        })
    }

    fn retry_delay(&self) -> Duration {
        let min = self.config.retry_delay_min_ms;
        let max = self.config.retry_delay_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::Header {
        name,
        value: value.to_owned(),
    })
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}
