use std::time::Duration;

pub const APP_ID: [&str; 2] = ["com", "RoganMatrivski"];

pub const CREDENTIALS_FILE_NAME: &str = "dropbox_credentials.json";
pub const DEFAULT_TARGET_DIR: &str = "downloaded_files";

pub const DROPBOX_WEB_HOST: &str = "https://www.dropbox.com";
pub const DROPBOX_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Wait before the single API retry after a rate-limited download.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

pub const SUB_BAR_FMT_MSG: &str =
    "{msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
pub const SUB_SPINNER_FMT_MSG: &str = "{spinner:.green} {msg:30!} {bytes} ({bytes_per_sec})";
pub const MAIN_BAR_CHARSET: &str = "=> ";

pub const SPINNER_FMT: &str = "{spinner:.green} {msg}";
pub const SPINNER_STRSET_DOTS12: &[&str] = &[
    "⢀⠀", "⡀⠀", "⠄⠀", "⢂⠀", "⡂⠀", "⠅⠀", "⢃⠀", "⡃⠀", "⠍⠀", "⢋⠀", "⡋⠀", "⠍⠁", "⢋⠁", "⡋⠁", "⠍⠉",
    "⠋⠉", "⠋⠉", "⠉⠙", "⠉⠙", "⠉⠩", "⠈⢙", "⠈⡙", "⢈⠩", "⡀⢙", "⠄⡙", "⢂⠩", "⡂⢘", "⠅⡘", "⢃⠨", "⡃⢐",
    "⠍⡐", "⢋⠠", "⡋⢀", "⠍⡁", "⢋⠁", "⡋⠁", "⠍⠉", "⠋⠉", "⠋⠉", "⠉⠙", "⠉⠙", "⠉⠩", "⠈⢙", "⠈⡙", "⠈⠩",
    "⠀⢙", "⠀⡙", "⠀⠩", "⠀⢘", "⠀⡘", "⠀⠨", "⠀⢐", "⠀⡐", "⠀⠠", "⠀⢀", "⠀⡀",
];
