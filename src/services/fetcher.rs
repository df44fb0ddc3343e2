use anyhow::{anyhow, bail, Context, Result};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;

/// Downloads the source playlist
pub struct PlaylistFetcher {
    client: Client,
    max_retries: u32,
    max_size_mb: usize,
}

/// Exponential backoff: 500ms, 1s, 2s, ... capped at 10s
fn backoff_ms(attempt: u32) -> u64 {
    (1u64 << attempt.min(16)).saturating_mul(500).min(10_000)
}

fn friendly_status(status: reqwest::StatusCode) -> String {
    match status {
        reqwest::StatusCode::NOT_FOUND => "Playlist not found (404). Check SOURCE_URL.".to_string(),
        reqwest::StatusCode::FORBIDDEN => "Access denied (403). The playlist may require authentication.".to_string(),
        reqwest::StatusCode::TOO_MANY_REQUESTS => "Too many requests (429). The playlist host is rate limiting.".to_string(),
        _ => {
            let reason = status
                .canonical_reason()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Error".to_string());
            format!("HTTP {}: {}", status.as_u16(), reason)
        }
    }
}

impl PlaylistFetcher {
    pub fn new(user_agent: &str, timeout_ms: u64, max_retries: u32, max_size_mb: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_retries,
            max_size_mb,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.user_agent,
            config.fetch_timeout_ms,
            config.max_retries,
            config.max_playlist_size_mb,
        )
    }

    fn max_bytes(&self) -> u64 {
        (self.max_size_mb as u64) * 1024 * 1024
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Response> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    if resp.status().is_success() {
                        if let Some(len) = resp.content_length() {
                            if len > self.max_bytes() {
                                bail!(
                                    "Playlist too large: {:.1}MB (limit {}MB)",
                                    len as f64 / 1024f64 / 1024f64,
                                    self.max_size_mb
                                );
                            }
                        }

                        return Ok(resp);
                    }

                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let backoff = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "429", "backoff_ms" = backoff);
                        sleep(Duration::from_millis(backoff)).await;
                        continue;
                    }

                    bail!("{}", friendly_status(status));
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        let backoff = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "network", "backoff_ms" = backoff);
                        last_err = Some(err);
                        sleep(Duration::from_millis(backoff)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }

        match last_err {
            Some(e) => Err(e.into()),
            None => Err(anyhow!("Unknown fetch error")),
        }
    }

    /// Fetch the playlist as text, enforcing the size limit while streaming
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .fetch_with_retry(url)
            .await
            .with_context(|| format!("Failed to fetch playlist from {}", url))?;

        let max_bytes = self.max_bytes() as usize;
        let mut body: Vec<u8> = Vec::with_capacity(response.content_length().unwrap_or(0).min(max_bytes as u64) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read playlist body")?;
            if body.len() + chunk.len() > max_bytes {
                bail!("Playlist exceeds size limit of {}MB", self.max_size_mb);
            }
            body.extend_from_slice(&chunk);
        }

        tracing::info!("Downloaded playlist: {:.2} KB", body.len() as f64 / 1024.0);

        Ok(decode_body(body))
    }
}

/// UTF-8 decode, replacing invalid sequences and dropping a leading BOM
fn decode_body(body: Vec<u8>) -> String {
    let text = match String::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Playlist is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_ms(0), 500);
        assert_eq!(backoff_ms(1), 1000);
        assert_eq!(backoff_ms(5), 10_000);
        assert_eq!(backoff_ms(40), 10_000);
    }

    #[test]
    fn test_friendly_status() {
        assert!(friendly_status(reqwest::StatusCode::NOT_FOUND).contains("404"));
        assert_eq!(
            friendly_status(reqwest::StatusCode::BAD_GATEWAY),
            "HTTP 502: Bad Gateway"
        );
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body("\u{feff}#EXTM3U".as_bytes().to_vec()), "#EXTM3U");
        assert_eq!(decode_body(vec![b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn test_fetcher_builds() {
        assert!(PlaylistFetcher::new("test-agent", 1000, 0, 1).is_ok());
    }
}
