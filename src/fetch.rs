//! HTTP retrieval for toolchain archives and patch files
//!
//! Retries live here and only here: a transfer is attempted up to the
//! caller's budget with a fixed delay between attempts, then the last
//! failure is returned.

use crate::error::{BuilderError, BuilderResult};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Downloads a URL to a local file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` into `dest`, trying at most `attempts` times.
    /// Returns the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path, attempts: u32) -> BuilderResult<u64>;
}

/// Fetcher backed by a blocking `ureq` agent on the blocking thread pool
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    retry_delay: Duration,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(retry_delay: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(30)))
            .build()
            .into();
        Self {
            agent,
            retry_delay,
            show_progress: false,
        }
    }

    /// Draw a byte progress bar while transferring
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn transfer(&self, url: &str, dest: &Path) -> Result<u64, String> {
        let mut response = self.agent.get(url).call().map_err(|e| e.to_string())?;

        let total = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let bar = self.show_progress.then(|| progress_bar(total, dest));

        let file = File::create(dest).map_err(|e| format!("creating {}: {}", dest.display(), e))?;
        let mut writer = BufWriter::new(file);
        let mut reader = response.body_mut().as_reader();
        let mut buf = vec![0u8; 64 * 1024];
        let mut written = 0u64;

        loop {
            let n = reader.read(&mut buf).map_err(|e| e.to_string())?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).map_err(|e| e.to_string())?;
            written += n as u64;
            if let Some(ref bar) = bar {
                bar.set_position(written);
            }
        }
        writer.flush().map_err(|e| e.to_string())?;

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        Ok(written)
    }
}

fn progress_bar(total: Option<u64>, dest: &Path) -> ProgressBar {
    let bar = match total {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    let style = ProgressStyle::default_bar()
        .template("  {spinner:.green} {prefix} {bar:24.green/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─");
    bar.set_style(style);
    bar.set_prefix(
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    bar
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path, attempts: u32) -> BuilderResult<u64> {
        let attempts = attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!("GET {} (attempt {}/{})", url, attempt, attempts);

            let this = self.clone();
            let target: PathBuf = dest.to_path_buf();
            let source = url.to_string();
            let result = tokio::task::spawn_blocking(move || this.transfer(&source, &target))
                .await
                .map_err(|e| BuilderError::Internal(format!("download task panicked: {}", e)))?;

            match result {
                Ok(bytes) => {
                    info!("Downloaded {} ({} bytes)", url, bytes);
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!("Download of {} failed (attempt {}/{}): {}", url, attempt, attempts, e);
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        // Drop any partial file
        let _ = tokio::fs::remove_file(dest).await;

        Err(BuilderError::Download {
            url: url.to_string(),
            attempts,
            reason: last_error,
        })
    }
}
