use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    path::Path,
};

use color_eyre::eyre::eyre;

use super::api::{ApiFailure, ListPage, RemoteEntry, SharedFolderApi};

/// In-memory listing + content service. Folders are keyed by their listing
/// path (`""` for the link root) and may span several pages.
#[derive(Default)]
pub struct FakeApi {
    pages: HashMap<String, Vec<Vec<RemoteEntry>>>,
    failing_folders: HashSet<String>,
    rate_limited_once: HashSet<String>,
    rate_limited_always: HashSet<String>,

    listed: RefCell<Vec<String>>,
    downloads: RefCell<Vec<String>>,
    rate_limit_hits: RefCell<HashSet<String>>,
}

pub fn file(name: &str, id: &str) -> RemoteEntry {
    RemoteEntry::File {
        name: name.to_string(),
        id: id.to_string(),
    }
}

pub fn folder(name: &str) -> RemoteEntry {
    RemoteEntry::Folder {
        name: name.to_string(),
        id: format!("id:{name}"),
    }
}

impl FakeApi {
    pub fn folder(self, path: &str, entries: Vec<RemoteEntry>) -> Self {
        self.paged_folder(path, vec![entries])
    }

    pub fn paged_folder(mut self, path: &str, pages: Vec<Vec<RemoteEntry>>) -> Self {
        self.pages.insert(path.to_string(), pages);
        self
    }

    pub fn failing_folder(mut self, path: &str) -> Self {
        self.failing_folders.insert(path.to_string());
        self
    }

    pub fn rate_limit_once(mut self, id: &str) -> Self {
        self.rate_limited_once.insert(id.to_string());
        self
    }

    pub fn rate_limit_always(mut self, id: &str) -> Self {
        self.rate_limited_always.insert(id.to_string());
        self
    }

    /// Listing paths in call order, one item per page served.
    pub fn listed(&self) -> Vec<String> {
        self.listed.borrow().clone()
    }

    /// Entry ids passed to `download_to_file`, in call order.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.borrow().clone()
    }

    fn page(&self, path: &str, index: usize) -> Result<ListPage, ApiFailure> {
        if self.failing_folders.contains(path) {
            return Err(ApiFailure::Failed(eyre!("listing {path} refused")));
        }

        let pages = self
            .pages
            .get(path)
            .ok_or_else(|| ApiFailure::Failed(eyre!("path/not_found: {path}")))?;
        let entries = pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < pages.len();

        self.listed.borrow_mut().push(path.to_string());

        Ok(ListPage {
            entries,
            has_more,
            cursor: format!("{path}#{}", index + 1),
        })
    }
}

impl SharedFolderApi for FakeApi {
    async fn list_folder(&self, path: &str, _shared_link: &str) -> Result<ListPage, ApiFailure> {
        self.page(path, 0)
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, ApiFailure> {
        let (path, index) = cursor
            .rsplit_once('#')
            .ok_or_else(|| ApiFailure::Failed(eyre!("bad cursor {cursor}")))?;
        let index = index
            .parse::<usize>()
            .map_err(|e| ApiFailure::Failed(e.into()))?;

        self.page(path, index)
    }

    async fn download_to_file(
        &self,
        entry_id: &str,
        local_path: &Path,
    ) -> Result<u64, ApiFailure> {
        self.downloads.borrow_mut().push(entry_id.to_string());

        if self.rate_limited_always.contains(entry_id)
            || (self.rate_limited_once.contains(entry_id)
                && self.rate_limit_hits.borrow_mut().insert(entry_id.to_string()))
        {
            return Err(ApiFailure::RateLimited { retry_after: None });
        }

        let body = format!("content of {entry_id}");
        tokio::fs::write(local_path, &body).await?;

        Ok(body.len() as u64)
    }
}
