use color_eyre::{
    eyre::{bail, Context},
    Report,
};

use services::dropbox::{
    auth::{ConsolePrompt, CredentialManager},
    paths::{RemoteDir, ShareRoot},
    shared_link::SharedLinkUrl,
    FolderDownloader,
};

mod consts;
mod funcs;
mod init;
mod services;
mod statics;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Report> {
    let args = init::initialize()?;

    let target_dir = &args.target_dir;
    if target_dir.exists() && !target_dir.is_dir() {
        bail!("Target path {} exists and is not a directory", target_dir.display());
    }

    let manager = CredentialManager::new(args.auth_config(), ConsolePrompt);
    let api = manager
        .get_client()
        .await
        .wrap_err("Failed to initialize Dropbox client")?;

    let link = SharedLinkUrl::new(args.shared_link.as_str());
    let share_root = ShareRoot::from_raw(Some(&args.share_root));

    tracing::info!("Starting download from shared link: {link}");
    tracing::info!("Dropbox root: {:?}", args.share_root);
    tracing::info!("Saving files to: {}", target_dir.display());

    if link.rlkey().is_none() {
        tracing::warn!("Shared link has no rlkey, every file goes through the Dropbox API");
    }

    let report = FolderDownloader::new(api, link, target_dir)
        .with_share_root(share_root)
        .run(RemoteDir::AtShareRoot)
        .await;

    if report.is_clean() {
        tracing::info!("Download completed successfully!");
    } else {
        tracing::warn!("Download finished with errors");
    }

    statics::MPB.suspend(|| println!("{report}"));

    Ok(())
}
