use std::{path::PathBuf, time::Duration};

use super::{
    api::{ApiFailure, ListPage, RemoteEntry, SharedFolderApi},
    downloader::{DirectDownloader, FileFetcher, FileOutcome},
    paths::{RemoteDir, ShareRoot},
    shared_link::SharedLinkUrl,
};
use crate::{consts, funcs::progressbar::create_indefinite_spinner, statics::MPB};

/// A remote path that was given up on, with the last error seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: String,
    pub reason: String,
}

impl Skipped {
    fn new(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Tally of one mirror run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    pub downloaded: Vec<String>,
    pub retried: Vec<String>,
    pub failed_files: Vec<Skipped>,
    pub failed_folders: Vec<Skipped>,
}

impl MirrorReport {
    pub fn is_clean(&self) -> bool {
        self.failed_files.is_empty() && self.failed_folders.is_empty()
    }
}

impl std::fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} downloaded ({} after rate limiting), {} files failed, {} folders skipped",
            self.downloaded.len(),
            self.retried.len(),
            self.failed_files.len(),
            self.failed_folders.len()
        )?;

        for s in &self.failed_files {
            write!(f, "\n  file {}: {}", s.path, s.reason)?;
        }
        for s in &self.failed_folders {
            write!(f, "\n  folder {}: {}", s.path, s.reason)?;
        }

        Ok(())
    }
}

/// Mirrors the tree behind a shared link onto a local directory.
pub struct FolderDownloader<A> {
    api: A,
    link: SharedLinkUrl,
    local_root: PathBuf,
    share_root: ShareRoot,
    direct: DirectDownloader,
    backoff: Duration,
}

impl<A: SharedFolderApi> FolderDownloader<A> {
    pub fn new(api: A, link: SharedLinkUrl, local_root: impl Into<PathBuf>) -> Self {
        Self {
            api,
            link,
            local_root: local_root.into(),
            share_root: ShareRoot::Root,
            direct: DirectDownloader::default(),
            backoff: consts::RATE_LIMIT_BACKOFF,
        }
    }

    pub fn with_share_root(mut self, share_root: ShareRoot) -> Self {
        self.share_root = share_root;
        self
    }

    pub fn with_direct(mut self, direct: DirectDownloader) -> Self {
        self.direct = direct;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Walk from `start` (normally the share root) and download every file below it.
    pub async fn run(&self, start: RemoteDir) -> MirrorReport {
        let mut report = MirrorReport::default();
        walk_shared_folder(self, start, &mut report).await;
        report
    }

    async fn list(
        &self,
        dir: &RemoteDir,
        cursor: Option<&str>,
    ) -> Result<ListPage, ApiFailure> {
        let pb = create_indefinite_spinner(&MPB, format!("Listing {dir}"))?;

        let res = match cursor {
            None => self.api.list_folder(dir.list_path(), self.link.as_str()).await,
            Some(cursor) => {
                tracing::trace!("Continuing {dir} from cursor {cursor}");
                self.api.list_folder_continue(cursor).await
            }
        };

        pb.finish_and_clear();
        res
    }

    fn skip_folder(&self, dir: &RemoteDir, e: ApiFailure, report: &mut MirrorReport) {
        tracing::warn!("Error processing folder {dir}: {e}");
        report.failed_folders.push(Skipped::new(dir.to_string(), e));
    }

    async fn process_entry(
        &self,
        dir: &RemoteDir,
        entry: RemoteEntry,
        report: &mut MirrorReport,
    ) {
        let full_path = dir.child_path(entry.name());
        let local_path = self.share_root.local_path(&self.local_root, &full_path);

        tracing::info!(
            "Processing entry: {} at path: {full_path} (local: {})",
            entry.name(),
            local_path.display()
        );

        match entry {
            RemoteEntry::Folder { name, id } => {
                tracing::debug!("Entering folder {name} ({id})");
                walk_shared_folder(self, dir.child(&name), report).await;
            }
            RemoteEntry::File { name, id } => {
                if let Some(parent) = local_path.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        tracing::warn!("Cannot create {}: {e}", parent.display());
                        report.failed_files.push(Skipped::new(full_path, e));
                        return;
                    }
                }

                let fetcher = FileFetcher {
                    api: &self.api,
                    direct: &self.direct,
                    link: &self.link,
                    backoff: self.backoff,
                };

                match fetcher.fetch(&id, &name, &full_path, &local_path).await {
                    FileOutcome::Downloaded { via, retried } => {
                        tracing::debug!("{full_path} fetched via {via:?}");
                        if retried {
                            report.retried.push(full_path.clone());
                        }
                        report.downloaded.push(full_path);
                    }
                    FileOutcome::Failed(reason) => {
                        report.failed_files.push(Skipped::new(full_path, reason))
                    }
                }
            }
        }
    }
}

/// List `dir` page by page and handle every entry before returning. A failed
/// listing call skips this subtree only.
#[async_recursion::async_recursion(?Send)]
async fn walk_shared_folder<A: SharedFolderApi>(
    dl: &FolderDownloader<A>,
    dir: RemoteDir,
    report: &mut MirrorReport,
) {
    let mut page = match dl.list(&dir, None).await {
        Ok(page) => page,
        Err(e) => return dl.skip_folder(&dir, e, report),
    };

    loop {
        for entry in std::mem::take(&mut page.entries) {
            dl.process_entry(&dir, entry, report).await;
        }

        if !page.has_more {
            break;
        }

        page = match dl.list(&dir, Some(&page.cursor)).await {
            Ok(page) => page,
            Err(e) => return dl.skip_folder(&dir, e, report),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dropbox::fake::{file, folder, FakeApi};

    fn downloader(
        api: FakeApi,
        link: &str,
        root: &std::path::Path,
    ) -> FolderDownloader<FakeApi> {
        FolderDownloader::new(api, SharedLinkUrl::new(link), root)
            .with_direct(DirectDownloader::new("http://127.0.0.1:9"))
            .with_backoff(Duration::from_millis(0))
    }

    const NO_RLKEY: &str = "https://www.dropbox.com/sh/abc/def?dl=0";

    fn paths(skipped: &[Skipped]) -> Vec<&str> {
        skipped.iter().map(|s| s.path.as_str()).collect()
    }

    #[tokio::test]
    async fn visits_every_page_in_order() {
        let api = FakeApi::default().paged_folder(
            "",
            vec![
                vec![file("1.txt", "p1a"), file("2.txt", "p1b")],
                vec![file("3.txt", "p2a")],
                vec![file("4.txt", "p3a"), file("5.txt", "p3b")],
            ],
        );
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(dl.api().listed(), vec!["", "", ""]);
        assert_eq!(dl.api().downloads(), vec!["p1a", "p1b", "p2a", "p3a", "p3b"]);
        assert_eq!(
            report.downloaded,
            vec!["/1.txt", "/2.txt", "/3.txt", "/4.txt", "/5.txt"]
        );
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn no_rlkey_routes_everything_through_api() {
        let api = FakeApi::default()
            .folder("", vec![file("a.txt", "fa"), folder("sub")])
            .folder("/sub", vec![file("b.txt", "fb")]);
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(dl.api().downloads(), vec!["fa", "fb"]);
        assert_eq!(report.downloaded.len(), 2);
        assert!(dir.path().join("sub").join("b.txt").is_file());
    }

    #[tokio::test]
    async fn files_sharing_a_parent_both_land() {
        let api = FakeApi::default()
            .folder("", vec![folder("deep")])
            .folder("/deep", vec![folder("er")])
            .folder("/deep/er", vec![file("x.txt", "fx"), file("y.txt", "fy")]);
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert!(report.is_clean());
        let parent = dir.path().join("deep").join("er");
        assert_eq!(
            std::fs::read_to_string(parent.join("x.txt")).unwrap(),
            "content of fx"
        );
        assert_eq!(
            std::fs::read_to_string(parent.join("y.txt")).unwrap(),
            "content of fy"
        );
    }

    #[tokio::test]
    async fn failed_subfolder_does_not_stop_siblings() {
        let api = FakeApi::default()
            .folder("", vec![folder("A")])
            .folder(
                "/A",
                vec![
                    file("one.txt", "f1"),
                    folder("B"),
                    folder("C"),
                    file("two.txt", "f2"),
                ],
            )
            .failing_folder("/A/B")
            .folder("/A/C", vec![file("c.txt", "fc")]);
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(paths(&report.failed_folders), vec!["/A/B"]);
        assert!(report.failed_folders[0].reason.contains("refused"));
        assert_eq!(report.downloaded, vec!["/A/one.txt", "/A/C/c.txt", "/A/two.txt"]);
        assert!(dir.path().join("A").join("C").join("c.txt").is_file());
    }

    #[tokio::test]
    async fn failed_root_listing_yields_empty_report() {
        let api = FakeApi::default().failing_folder("");
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(paths(&report.failed_folders), vec!["/"]);
        assert!(report.downloaded.is_empty());
    }

    #[tokio::test]
    async fn rate_limited_file_is_counted_as_retried() {
        let api = FakeApi::default()
            .folder("", vec![file("a.txt", "fa"), file("b.txt", "fb")])
            .rate_limit_once("fa");
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(dl.api().downloads(), vec!["fa", "fa", "fb"]);
        assert_eq!(report.retried, vec!["/a.txt"]);
        assert_eq!(report.downloaded, vec!["/a.txt", "/b.txt"]);
    }

    #[tokio::test]
    async fn failed_file_is_skipped() {
        let api = FakeApi::default()
            .folder("", vec![file("a.txt", "fa"), file("b.txt", "fb")])
            .rate_limit_always("fa");
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(api, NO_RLKEY, dir.path());

        let report = dl.run(RemoteDir::AtShareRoot).await;

        assert_eq!(paths(&report.failed_files), vec!["/a.txt"]);
        assert!(report.failed_files[0].reason.contains("rate limited"));
        assert_eq!(report.downloaded, vec!["/b.txt"]);
        assert!(!report.is_clean());

        let summary = report.to_string();
        assert!(summary.starts_with("1 downloaded (0 after rate limiting), 1 files failed"));
        assert!(summary.contains("file /a.txt: rate limited"));
    }

    #[tokio::test]
    async fn mirrors_shared_link_with_rlkey_over_direct_downloads() {
        let mut server = mockito::Server::new_async().await;
        let report_mock = server
            .mock("GET", "/scl/fi/id:r1/report.pdf")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("dl".into(), "1".into()),
                mockito::Matcher::UrlEncoded("rlkey".into(), "KEY1".into()),
            ]))
            .with_body("report")
            .create_async()
            .await;
        let csv_mock = server
            .mock("GET", "/scl/fi/id:c1/a.csv")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("dl".into(), "1".into()),
                mockito::Matcher::UrlEncoded("rlkey".into(), "KEY1".into()),
            ]))
            .with_body("a,b\n1,2\n")
            .create_async()
            .await;

        let api = FakeApi::default()
            .folder("", vec![file("report.pdf", "id:r1"), folder("data")])
            .folder("/data", vec![file("a.csv", "id:c1")]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let link = SharedLinkUrl::new("https://x/scl/fo/ABC?rlkey=KEY1");
        let dl = FolderDownloader::new(api, link, &out)
            .with_direct(DirectDownloader::new(server.url()));

        let report = dl.run(RemoteDir::from_raw(None)).await;

        report_mock.assert_async().await;
        csv_mock.assert_async().await;
        assert!(dl.api().downloads().is_empty());
        assert_eq!(report.downloaded, vec!["/report.pdf", "/data/a.csv"]);
        assert_eq!(std::fs::read_to_string(out.join("report.pdf")).unwrap(), "report");
        assert_eq!(
            std::fs::read_to_string(out.join("data").join("a.csv")).unwrap(),
            "a,b\n1,2\n"
        );
    }
}
