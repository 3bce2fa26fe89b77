use reqwest::Url;

/// A Dropbox shared link together with its embedded `rlkey`, if any.
#[derive(Debug, Clone)]
pub struct SharedLinkUrl {
    url: String,
    rlkey: Option<String>,
}

impl SharedLinkUrl {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let rlkey = extract_rlkey(&url);

        Self { url, rlkey }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn rlkey(&self) -> Option<&str> {
        self.rlkey.as_deref()
    }
}

impl std::fmt::Display for SharedLinkUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// First non-empty `rlkey` query parameter. Unparseable links have none.
pub fn extract_rlkey(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    parsed
        .query_pairs()
        .find(|(k, _)| k == "rlkey")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// `{host}/scl/fi/{id}/{name}?dl=1&rlkey={rlkey}`
pub fn direct_download_url(host: &str, id: &str, name: &str, rlkey: &str) -> String {
    format!(
        "{host}/scl/fi/{id}/{name}?dl=1&rlkey={rlkey}",
        host = host.trim_end_matches('/'),
        name = urlencoding::encode(name),
        rlkey = urlencoding::encode(rlkey),
    )
}
