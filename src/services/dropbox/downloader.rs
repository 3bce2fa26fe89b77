use std::{path::Path, time::Duration};

use color_eyre::{eyre::eyre, Report};
use futures_util::StreamExt;
use tokio::{fs::File, io::AsyncWriteExt};

use super::{
    api::{ApiFailure, SharedFolderApi},
    shared_link::{direct_download_url, SharedLinkUrl},
};
use crate::{consts, funcs::progressbar::create_transfer_bar, statics::MPB};

/// Unauthenticated `?dl=1` downloads authorized by the link's `rlkey`.
#[derive(Debug, Clone)]
pub struct DirectDownloader {
    http: reqwest::Client,
    host: String,
}

impl Default for DirectDownloader {
    fn default() -> Self {
        Self::new(consts::DROPBOX_WEB_HOST)
    }
}

impl DirectDownloader {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
        }
    }

    pub fn url_for(&self, id: &str, name: &str, rlkey: &str) -> String {
        direct_download_url(&self.host, id, name, rlkey)
    }

    /// Stream `url` into `local_path`. Returns the number of bytes written.
    pub async fn download(&self, url: &str, local_path: &Path) -> Result<u64, ApiFailure> {
        tracing::debug!("GET {url}");

        let response = self.http.get(url).send().await?.error_for_status()?;

        let name = local_path
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pb = create_transfer_bar(&MPB, response.content_length(), &name)?;

        let mut file = File::create(local_path).await?;
        let mut written = 0u64;

        let mut bodystream = response.bytes_stream();
        while let Some(chunk) = bodystream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
        }

        file.flush().await?;
        pb.finish_and_clear();

        Ok(written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Api,
}

#[derive(Debug)]
pub enum FileOutcome {
    Downloaded { via: Strategy, retried: bool },
    Failed(Report),
}

enum Attempt {
    First(Strategy),
    Retry,
}

/// Picks the download strategy for each file and applies the
/// retry-once-after-rate-limit policy.
pub struct FileFetcher<'a, A> {
    pub api: &'a A,
    pub direct: &'a DirectDownloader,
    pub link: &'a SharedLinkUrl,
    pub backoff: Duration,
}

impl<A: SharedFolderApi> FileFetcher<'_, A> {
    pub fn first_strategy(&self) -> Strategy {
        match self.link.rlkey() {
            Some(_) => Strategy::Direct,
            None => Strategy::Api,
        }
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        id: &str,
        name: &str,
        local_path: &Path,
    ) -> Result<u64, ApiFailure> {
        match (strategy, self.link.rlkey()) {
            (Strategy::Direct, Some(rlkey)) => {
                let url = self.direct.url_for(id, name, rlkey);
                self.direct.download(&url, local_path).await
            }
            _ => self.api.download_to_file(id, local_path).await,
        }
    }

    pub async fn fetch(
        &self,
        id: &str,
        name: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> FileOutcome {
        let mut state = Attempt::First(self.first_strategy());

        loop {
            let (strategy, retried) = match state {
                Attempt::First(s) => (s, false),
                Attempt::Retry => (Strategy::Api, true),
            };

            match self.attempt(strategy, id, name, local_path).await {
                Ok(bytes) => {
                    if retried {
                        tracing::info!("Retry successful: {remote_path}");
                    } else {
                        tracing::info!("Downloaded: {remote_path} ({bytes} bytes)");
                    }
                    return FileOutcome::Downloaded { via: strategy, retried };
                }
                Err(ApiFailure::RateLimited { retry_after }) if !retried => {
                    tracing::warn!(
                        "Rate limited downloading {remote_path}, retrying in {}s{}",
                        self.backoff.as_secs_f32(),
                        retry_after
                            .map(|d| format!(" (server asked for {}s)", d.as_secs()))
                            .unwrap_or_default()
                    );
                    tokio::time::sleep(self.backoff).await;
                    state = Attempt::Retry;
                }
                Err(e) => {
                    let reason = match e {
                        ApiFailure::Failed(report) => report,
                        rl @ ApiFailure::RateLimited { .. } => eyre!("{rl}"),
                    };
                    if retried {
                        tracing::warn!("Retry failed for {remote_path}: {reason}");
                    } else {
                        tracing::warn!("Error downloading {remote_path}: {reason}");
                    }
                    return FileOutcome::Failed(reason);
                }
            }
        }
    }
}
