//! Streaming download with mirror fallback and per-mirror retries.
//!
//! Each URL gets a full retry budget before the next mirror is tried; the
//! first mirror that delivers a complete body wins and the rest are skipped.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::Error;
use crate::reporter::{Progress, Reporter};

/// Failure of a single attempt against a single URL.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Body truncated: got {received} of {expected} bytes")]
    Truncated { received: u64, expected: u64 },
}

/// How often a single URL is attempted before moving on to the next mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(1),
        }
    }
}

/// Build the HTTP client shared by all downloads.
///
/// `read_timeout` bounds each wait for more body data, so a mirror that
/// stalls mid-transfer fails the attempt instead of hanging it.
pub fn build_client(read_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .read_timeout(read_timeout)
        .build()
}

/// Downloads one resource from an ordered list of mirrors.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    progress_interval: Duration,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(client: Client, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            progress_interval: Duration::from_millis(200),
            reporter,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Download `dest` from the first mirror in `urls` that succeeds.
    ///
    /// Returns the number of bytes written. Every per-attempt failure is
    /// absorbed; only exhausting all mirrors is reported, as
    /// [`Error::NetworkFailure`], and leaves no partial file behind.
    pub async fn fetch(&self, urls: &[String], dest: &Path) -> Result<u64, Error> {
        let label = dest
            .file_name()
            .map_or_else(|| dest.display().to_string(), |n| n.to_string_lossy().into_owned());

        for url in urls {
            match self.fetch_with_retry(url, dest, &label).await {
                Ok(bytes) => {
                    self.reporter.downloaded(&label, bytes);
                    return Ok(bytes);
                }
                Err(e) => warn!(url = %url, error = %e, "Mirror exhausted its retry budget"),
            }
        }

        tokio::fs::remove_file(dest).await.ok();
        Err(Error::NetworkFailure {
            label,
            mirrors: urls.len(),
        })
    }

    async fn fetch_with_retry(&self, url: &str, dest: &Path, label: &str) -> Result<u64, FetchError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, dest, label).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < attempts => {
                    debug!(url, attempt, error = %e, "Download attempt failed");
                    self.reporter.retrying(label, attempt, &e.to_string());
                    tokio::time::sleep(self.policy.pause).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One GET streamed to disk.
    async fn fetch_once(&self, url: &str, dest: &Path, label: &str) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length();
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let mut downloaded: u64 = 0;

        self.reporter
            .downloading(label, &throttle.snapshot(downloaded, total));

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if throttle.ready() {
                self.reporter
                    .downloading(label, &throttle.snapshot(downloaded, total));
            }
        }
        file.flush().await?;

        if let Some(expected) = total {
            if downloaded < expected {
                return Err(FetchError::Truncated {
                    received: downloaded,
                    expected,
                });
            }
        }

        self.reporter
            .downloading(label, &throttle.snapshot(downloaded, total));
        Ok(downloaded)
    }
}

/// Time-gated progress emission, so fast links do not flood the output.
#[derive(Debug)]
struct ProgressThrottle {
    started: Instant,
    last: Instant,
    interval: Duration,
}

impl ProgressThrottle {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            interval,
        }
    }

    fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    fn snapshot(&self, downloaded: u64, total: Option<u64>) -> Progress {
        let elapsed = self.started.elapsed().as_secs_f64();
        let bytes_per_sec = if elapsed > 0.0 {
            downloaded as f64 / elapsed
        } else {
            0.0
        };
        Progress {
            downloaded,
            total,
            bytes_per_sec,
        }
    }
}
