//! Gated, retrying HTTP transfers
//!
//! [`PageDownloader`] moves one remote file per call, either into the content
//! store (pages) or onto a local path (frame archives). Each HTTP attempt holds a
//! transfer permit for exactly its own duration; the permit is released before the
//! retry delay starts. Bodies are streamed chunk by chunk and never buffered whole.

use crate::cache::{ByteStream, ContentStore};
use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::gate::{TransferGate, TransferPermit};
use crate::retry::{IsRetryable, download_with_retry_cancellable};
use crate::types::PageTask;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Build the HTTP client shared by the provider and the downloader
///
/// Every request carries the configured `User-Agent` and, when set, `Referer`.
/// `request_timeout` bounds each attempt end to end, body included.
pub fn build_http_client(http: &HttpConfig, retry: &RetryConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(referer) = &http.referer {
        let value = HeaderValue::from_str(referer)
            .map_err(|e| Error::config("http.referer", format!("invalid header value: {}", e)))?;
        headers.insert(REFERER, value);
    }

    reqwest::Client::builder()
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .timeout(retry.request_timeout)
        .build()
        .map_err(|e| Error::config("http", format!("failed to build HTTP client: {}", e)))
}

/// Downloads remote files through the transfer gate with retry
#[derive(Clone)]
pub struct PageDownloader {
    client: reqwest::Client,
    gate: TransferGate,
    store: Arc<dyn ContentStore>,
    retry: RetryConfig,
    permit_timeout: Option<Duration>,
}

impl PageDownloader {
    /// Create a downloader sharing `gate` and writing pages into `store`
    pub fn new(
        client: reqwest::Client,
        gate: TransferGate,
        store: Arc<dyn ContentStore>,
        retry: RetryConfig,
        permit_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            gate,
            store,
            retry,
            permit_timeout,
        }
    }

    /// Download one page into the store under `task.relative_path`
    ///
    /// Transient transport failures are retried up to `retry.max_attempts` times
    /// in total; running out of attempts yields [`Error::RetriesExhausted`]. HTTP
    /// status errors fail immediately.
    pub async fn download_page(
        &self,
        task: &PageTask,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let url = task.source_url.as_str();
        let key = task.relative_path.as_str();

        let outcome = download_with_retry_cancellable(&self.retry, cancel, || async move {
            guarded(cancel, async {
                let (_permit, response) = self.open(url).await?;
                self.store
                    .write(key, response_stream(response), ttl)
                    .await
                    .map_err(body_error)
            })
            .await
        })
        .await;

        let path = self.finish(url, outcome, cancel)?;
        debug!(url, page = task.index, ?path, "page downloaded");
        Ok(path)
    }

    /// Download `url` to a local file, bypassing the store
    ///
    /// Used for frame archives, which live only in a scratch workspace. A failed
    /// attempt truncates the file before the next one.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let outcome = download_with_retry_cancellable(&self.retry, cancel, || async move {
            guarded(cancel, async {
                let (_permit, response) = self.open(url).await?;
                write_file(dest, response_stream(response))
                    .await
                    .map_err(body_error)
            })
            .await
        })
        .await;

        let bytes = self.finish(url, outcome, cancel)?;
        info!(url, ?dest, bytes, "file downloaded");
        Ok(bytes)
    }

    /// Acquire a permit and send the request; the permit must outlive the body
    async fn open(&self, url: &str) -> Result<(TransferPermit, reqwest::Response)> {
        let permit = match self.permit_timeout {
            Some(limit) => self.gate.acquire_timeout(limit).await?,
            None => self.gate.acquire().await?,
        };

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok((permit, response))
    }

    fn finish<T>(&self, url: &str, outcome: Result<T>, cancel: &CancellationToken) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(_) if cancel.is_cancelled() => Err(Error::Cancelled),
            Err(e) if e.is_retryable() => Err(Error::RetriesExhausted {
                url: url.to_string(),
                attempts: self.retry.max_attempts.max(1),
                last_error: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Run one attempt, abandoning it as soon as `cancel` fires
async fn guarded<T>(
    cancel: &CancellationToken,
    attempt: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = attempt => result,
    }
}

/// Expose a response body as a chunk stream
///
/// Transport errors travel inside `io::Error` through the store and are turned
/// back into [`Error::Network`] by [`body_error`].
fn response_stream(response: reqwest::Response) -> ByteStream {
    futures::stream::try_unfold(response, |mut response| async move {
        match response.chunk().await {
            Ok(Some(chunk)) => Ok(Some((chunk, response))),
            Ok(None) => Ok(None),
            Err(e) => Err(std::io::Error::other(e)),
        }
    })
    .boxed()
}

/// Recover a transport error that surfaced while writing a body
fn body_error(err: Error) -> Error {
    let Error::Io(io) = err else {
        return err;
    };
    if !io
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>())
    {
        return Error::Io(io);
    }
    match io.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(transport)) => Error::Network(*transport),
        Some(Err(other)) => Error::Io(std::io::Error::other(other)),
        None => Error::Other("body stream failed without a cause".into()),
    }
}

async fn write_file(dest: &Path, mut body: ByteStream) -> Result<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut total = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(total)
}
