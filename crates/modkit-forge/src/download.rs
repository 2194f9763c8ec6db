//! HTTP transfer with retries.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;

use modkit_util::errors::ModkitError;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const PROGRESS_THRESHOLD: u64 = 100_000;

/// User agent sent with every registry request.
pub const USER_AGENT: &str = concat!("modkit/", env!("CARGO_PKG_VERSION"), " (v3)");

/// Build a shared reqwest client for registry traffic.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| {
            ModkitError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Send a GET, retrying server errors, timeouts and connection failures.
///
/// Any non-success status left after retries is an error.
async fn get_with_retries(client: &Client, url: &Url) -> miette::Result<reqwest::Response> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        match client.get(url.clone()).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(ModkitError::Network {
                        message: format!("HTTP {status} fetching {url}"),
                    }
                    .into());
                }
                return Ok(resp);
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::debug!("attempt {} for {url} failed: {e}", attempt + 1);
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(ModkitError::Network {
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(ModkitError::Network {
        message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
    }
    .into())
}

/// GET a JSON document and deserialize it.
pub async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: &Url) -> miette::Result<T> {
    let resp = get_with_retries(client, url).await?;
    let bytes = resp.bytes().await.map_err(|e| ModkitError::Network {
        message: format!("Failed to read response from {url}: {e}"),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ModkitError::Network {
            message: format!("Unexpected response from {url}: {e}"),
        }
        .into()
    })
}

/// Stream a file to `dest`, with a progress bar for larger downloads.
pub async fn download_to_file(client: &Client, url: &Url, dest: &Path, label: &str) -> miette::Result<()> {
    let resp = get_with_retries(client, url).await?;

    let total = resp.content_length().unwrap_or(0);
    let pb = (total > PROGRESS_THRESHOLD).then(|| modkit_util::progress::download_bar(total, label));

    let mut file = tokio::fs::File::create(dest).await.map_err(ModkitError::Io)?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ModkitError::Network {
            message: format!("Failed to read {url}: {e}"),
        })?;
        file.write_all(&chunk).await.map_err(ModkitError::Io)?;
        if let Some(pb) = &pb {
            pb.inc(chunk.len() as u64);
        }
    }
    file.flush().await.map_err(ModkitError::Io)?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(())
}
