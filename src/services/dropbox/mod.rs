pub mod api;
pub mod auth;
pub mod downloader;
pub mod paths;
pub mod shared_link;

pub mod walker;
pub use walker::FolderDownloader;

#[cfg(test)]
mod fake;
