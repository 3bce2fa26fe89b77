use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Error;

use crate::services::dropbox::auth::AuthConfig;

mod progress_writer;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Dropbox shared link to mirror, e.g. https://www.dropbox.com/scl/fo/...?rlkey=...
    #[arg(env = "DROPBOX_SHARED_LINK")]
    pub shared_link: String,

    /// Dropbox application key
    #[arg(long, env = "DROPBOX_APP_KEY")]
    pub app_key: String,

    /// Dropbox application secret
    #[arg(long, env = "DROPBOX_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,

    /// Local directory the shared tree is mirrored into.
    /// Will create dir if not exist.
    #[arg(long, default_value = crate::consts::DEFAULT_TARGET_DIR)]
    pub target_dir: PathBuf,

    /// Remote path that maps onto the target directory.
    /// Empty for the root of the shared link.
    #[arg(long, default_value_t = String::new())]
    pub share_root: String,

    /// Where the OAuth2 token pair is stored
    #[arg(long, env = "DROPBOX_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Verbosity log
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn get_credentials_path(&self) -> PathBuf {
        if let Some(c) = self.credentials.clone() {
            c
        } else {
            crate::statics::default_credentials_path()
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(&self.app_key, &self.app_secret, self.get_credentials_path())
    }
}

const VERBOSE_LEVEL: &[&str] = &["info", "debug", "trace"];

macro_rules! get_this_pkg_name {
    () => {
        env!("CARGO_PKG_NAME").replace('-', "_")
    };
}

fn log_level(verbose: u8) -> &'static str {
    VERBOSE_LEVEL[(verbose as usize).min(VERBOSE_LEVEL.len() - 1)]
}

/// `RUST_LOG` is taken as-is unless `-v` is given; without either, this
/// crate logs at info and everything else at warn.
fn env_filter(
    rust_log: Option<&str>,
    verbose: u8,
) -> Result<tracing_subscriber::EnvFilter, Error> {
    use tracing_subscriber::{filter::Directive, EnvFilter};

    let rust_log = rust_log.filter(|s| !s.trim().is_empty());
    let env_filter = EnvFilter::builder().parse_lossy(rust_log.unwrap_or_default());

    if rust_log.is_some() && verbose == 0 {
        return Ok(env_filter);
    }

    let crate_directive =
        format!("{}={}", get_this_pkg_name!(), log_level(verbose)).parse::<Directive>()?;

    Ok(env_filter
        .add_directive(tracing::level_filters::LevelFilter::WARN.into())
        .add_directive(crate_directive))
}

pub fn initialize() -> Result<Args, Error> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    color_eyre::install()?;
    let args = Args::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = env_filter(rust_log.as_deref(), args.verbose)?;

    let fmt_layer = fmt::layer()
        .with_writer(progress_writer::ProgressAwareStderr::new(
            crate::statics::MPB.clone(),
        ))
        .with_target(args.verbose > 0);

    let fmt_layer = match args.verbose {
        0 => fmt_layer.without_time().boxed(),
        _ => fmt_layer
            .with_level(true) // include levels in formatted output
            .with_thread_names(true) // include the name of the current thread
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(ErrorLayer::default())
        .init();

    Ok(args)
}
