use std::sync::LazyLock;

pub static MPB: LazyLock<indicatif::MultiProgress> = LazyLock::new(indicatif::MultiProgress::new);

/// Per-user data directory, or `None` when the platform has no home to put it in.
pub static PROJECT_DIR_PATH: LazyLock<Option<std::path::PathBuf>> = LazyLock::new(|| {
    directories::ProjectDirs::from(
        crate::consts::APP_ID[0],
        crate::consts::APP_ID[1],
        std::env!("CARGO_PKG_NAME"),
    )
    .map(|x| x.data_dir().to_path_buf())
});

pub fn default_credentials_path() -> std::path::PathBuf {
    match PROJECT_DIR_PATH.as_ref() {
        Some(dir) => dir.join(crate::consts::CREDENTIALS_FILE_NAME),
        None => std::path::PathBuf::from(crate::consts::CREDENTIALS_FILE_NAME),
    }
}
