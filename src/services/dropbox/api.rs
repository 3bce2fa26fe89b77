use std::{path::Path, time::Duration};

use async_compat::CompatExt;
use color_eyre::{eyre::ContextCompat, Report};
use dropbox_sdk::{
    async_routes::files::{download, list_folder, list_folder_continue},
    default_async_client::UserAuthDefaultClient,
    files::{
        DownloadArg, ListFolderArg, ListFolderContinueArg, ListFolderResult, Metadata, SharedLink,
    },
};
use tokio::fs::File;

use crate::{funcs::progressbar::create_transfer_bar, statics::MPB};

/// One listing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    File { name: String, id: String },
    Folder { name: String, id: String },
}

impl RemoteEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Folder { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    pub has_more: bool,
    pub cursor: String,
}

impl From<ListFolderResult> for ListPage {
    fn from(res: ListFolderResult) -> Self {
        let entries = res
            .entries
            .into_iter()
            .filter_map(|x| match x {
                Metadata::File(f) => Some(RemoteEntry::File {
                    name: f.name,
                    id: f.id,
                }),
                Metadata::Folder(f) => Some(RemoteEntry::Folder {
                    name: f.name,
                    id: f.id,
                }),
                other => {
                    tracing::trace!("Ignoring listing entry {other:?}");
                    None
                }
            })
            .collect();

        Self {
            entries,
            has_more: res.has_more,
            cursor: res.cursor,
        }
    }
}

/// Failure of a single remote call. Rate limiting is kept apart so callers
/// can decide on a retry.
#[derive(Debug)]
pub enum ApiFailure {
    RateLimited { retry_after: Option<Duration> },
    Failed(Report),
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (retry after {}s)", d.as_secs()),
            Self::RateLimited { retry_after: None } => f.write_str("rate limited"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

impl<E> From<dropbox_sdk::Error<E>> for ApiFailure
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: dropbox_sdk::Error<E>) -> Self {
        match e {
            dropbox_sdk::Error::RateLimited {
                retry_after_seconds,
                ..
            } => Self::RateLimited {
                retry_after: Some(Duration::from_secs(retry_after_seconds.into())),
            },
            other => Self::Failed(Report::new(other)),
        }
    }
}

impl From<std::io::Error> for ApiFailure {
    fn from(e: std::io::Error) -> Self {
        Self::Failed(e.into())
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return Self::RateLimited { retry_after: None };
        }

        Self::Failed(e.into())
    }
}

impl From<Report> for ApiFailure {
    fn from(e: Report) -> Self {
        Self::Failed(e)
    }
}

/// The remote calls the folder walk depends on.
pub trait SharedFolderApi {
    /// First page of `path` inside `shared_link`. `path` is `""` for the link root.
    async fn list_folder(&self, path: &str, shared_link: &str) -> Result<ListPage, ApiFailure>;

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, ApiFailure>;

    /// Fetch file content by its stable id and write it to `local_path`.
    async fn download_to_file(&self, entry_id: &str, local_path: &Path)
        -> Result<u64, ApiFailure>;
}

pub struct DropboxApi {
    client: UserAuthDefaultClient,
}

impl DropboxApi {
    pub fn new(client: UserAuthDefaultClient) -> Self {
        Self { client }
    }
}

impl SharedFolderApi for DropboxApi {
    async fn list_folder(&self, path: &str, shared_link: &str) -> Result<ListPage, ApiFailure> {
        let ls_arg = ListFolderArg::new(path.to_string())
            .with_shared_link(SharedLink::new(shared_link.to_string()));

        Ok(list_folder(&self.client, &ls_arg).await?.into())
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, ApiFailure> {
        let ls_cont_arg = ListFolderContinueArg::new(cursor.to_string());

        Ok(list_folder_continue(&self.client, &ls_cont_arg).await?.into())
    }

    async fn download_to_file(
        &self,
        entry_id: &str,
        local_path: &Path,
    ) -> Result<u64, ApiFailure> {
        let dl_arg = DownloadArg::new(entry_id.to_string());

        let res = download(&self.client, &dl_arg, None, None).await?;
        let res_body = res.body.wrap_err("Failed to get response body")?;

        let name = local_path
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry_id.to_string());
        let pb = create_transfer_bar(&MPB, res.content_length, &name)?;

        let mut file = File::create(local_path).await?;
        let mut wrapped_body = pb.wrap_async_read(res_body.compat());

        tracing::trace!("Downloading {entry_id} to {}", local_path.display());

        let written = tokio::io::copy(&mut wrapped_body, &mut file).await?;
        pb.finish_and_clear();

        Ok(written)
    }
}
