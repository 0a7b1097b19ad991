//! # rc-fetch-rtmpdump
//!
//! `MediaFetcher` backed by an external downloader process (rtmpdump by
//! default), invoked as `<program> [args..] -r <stream url> -o <destination>`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rc_core::error::{CatalogError, Result};
use rc_core::fetch::{derive_filename_in, FetchOutcome, OUTPUT_DIR};
use rc_core::models::Stream;
use rc_core::traits::MediaFetcher;
use tokio::fs;
use tokio::process::Command;

pub const DEFAULT_PROGRAM: &str = "rtmpdump";

pub struct RtmpdumpFetcher {
    program: OsString,
    /// Passed before `-r`/`-o` (e.g. "--quiet", "--live")
    args: Vec<OsString>,
    /// Directory receiving downloads (e.g. "./output")
    output_dir: PathBuf,
    /// Kill the downloader past this delay. Unbounded when `None`.
    timeout: Option<Duration>,
}

impl RtmpdumpFetcher {
    pub fn new(program: impl Into<OsString>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output_dir: output_dir.into(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for RtmpdumpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, OUTPUT_DIR)
    }
}

#[async_trait]
impl MediaFetcher for RtmpdumpFetcher {
    fn output_path(&self, stream: &Stream) -> PathBuf {
        derive_filename_in(&self.output_dir, stream)
    }

    /// Runs the downloader to completion and reports its exit status.
    async fn fetch(&self, stream: &Stream) -> Result<FetchOutcome> {
        let destination = self.output_path(stream);

        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            CatalogError::Fetch(format!(
                "cannot create output directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        log::debug!(
            "{} -r {} -o {}",
            self.program.to_string_lossy(),
            stream.url(),
            destination.display()
        );

        let mut command = Command::new(&self.program);
        command
            .kill_on_drop(true)
            .args(&self.args)
            .arg("-r")
            .arg(stream.url())
            .arg("-o")
            .arg(&destination);

        let mut child = command.spawn().map_err(|e| {
            CatalogError::Fetch(format!(
                "failed to start {}: {}",
                self.program.to_string_lossy(),
                e
            ))
        })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        log::warn!("could not kill downloader for {}: {}", stream, e);
                    }
                    return Err(CatalogError::Fetch(format!(
                        "{} timed out after {:?}",
                        stream.url(),
                        limit
                    )));
                }
            },
            None => child.wait().await,
        };
        let status = waited.map_err(|e| CatalogError::Fetch(format!("failed to wait for downloader: {e}")))?;

        if !status.success() {
            log::warn!("downloader exited with {} for {}", status, stream);
        }

        Ok(FetchOutcome {
            source_url: stream.url().to_string(),
            destination,
            exit_code: status.code(),
            success: status.success(),
        })
    }
}
