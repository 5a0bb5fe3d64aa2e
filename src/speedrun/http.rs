use crate::error::FetchError;
use crate::wr::config::HttpConfig;
use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

/// Blocking GET returning the response body. Implementations own their retry
/// policy; callers see only success or a terminal [`FetchError`].
pub trait Fetch {
    fn get_text(&self, url: &Url) -> Result<String, FetchError>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        (**self).get_text(url)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to initialise HTTP client")?;
        Ok(Self {
            client,
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
        })
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt + 1)
    }
}

impl Fetch for HttpClient {
    fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let mut last_status = 0u16;

        for attempt in 0..self.max_attempts {
            let started = Instant::now();
            let response = self.client.get(url.clone()).send();
            let elapsed = started.elapsed().as_secs_f64();

            let response = match response {
                Ok(response) => response,
                Err(source) => {
                    debug!(
                        "HTTP FAIL attempt={} err={} in {:.2}s: {}",
                        attempt + 1,
                        source,
                        elapsed,
                        url
                    );
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        source,
                    });
                }
            };

            let status = response.status();
            if status.is_success() {
                let body = response.text().map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;
                debug!(
                    "HTTP {} in {:.2}s ({} bytes): {}",
                    status.as_u16(),
                    elapsed,
                    body.len(),
                    url
                );
                return Ok(body);
            }

            debug!(
                "HTTP FAIL attempt={} code={} in {:.2}s: {}",
                attempt + 1,
                status.as_u16(),
                elapsed,
                url
            );

            if !is_retryable_status(status) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            last_status = status.as_u16();
            if attempt + 1 < self.max_attempts {
                thread::sleep(self.delay_for_attempt(attempt));
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            status: last_status,
        })
    }
}
