use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre::{bail, Context, ContextCompat, Error};
use dropbox_sdk::{
    default_async_client::UserAuthDefaultClient,
    oauth2::{Authorization, AuthorizeUrlBuilder, Oauth2Type, TokenCache, TokenType},
};
use serde::{Deserialize, Serialize};

use super::api::DropboxApi;
use crate::consts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Application identity plus where its tokens live.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub app_key: String,
    pub app_secret: String,
    pub credentials_path: PathBuf,
    pub token_url: String,
}

impl AuthConfig {
    pub fn new(app_key: &str, app_secret: &str, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            app_key: app_key.to_string(),
            app_secret: app_secret.to_string(),
            credentials_path: credentials_path.into(),
            token_url: consts::DROPBOX_TOKEN_URL.to_string(),
        }
    }
}

/// Turns an authorization URL into the code the user pasted back.
pub trait CodePrompt {
    fn prompt_code(&self, authorize_url: &str) -> Result<String, Error>;
}

pub struct ConsolePrompt;

impl CodePrompt for ConsolePrompt {
    fn prompt_code(&self, authorize_url: &str) -> Result<String, Error> {
        println!();
        println!("Dropbox requires permissions to use Dropbox API.");
        println!("1. Go to: {authorize_url}");
        println!("2. Click 'Allow' (you might have to log in first)");
        println!("3. Copy the authorization code");

        Ok(dialoguer::Input::<String>::new()
            .with_prompt("Enter the authorization code here")
            .interact_text()?)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

pub struct CredentialManager<P> {
    config: AuthConfig,
    prompt: P,
    http: reqwest::Client,
}

impl<P: CodePrompt> CredentialManager<P> {
    pub fn new(config: AuthConfig, prompt: P) -> Self {
        Self {
            config,
            prompt,
            http: reqwest::Client::new(),
        }
    }

    /// `Ok(None)` when no credentials file exists yet.
    pub fn load_credentials(&self) -> Result<Option<Credentials>, Error> {
        let path = &self.config.credentials_path;

        let creds_str = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("Cannot read {}", path.display()))
            }
        };

        let creds = serde_json::from_str(&creds_str)
            .wrap_err_with(|| format!("Malformed Dropbox credentials in {}", path.display()))?;

        Ok(Some(creds))
    }

    pub fn save_credentials(&self, creds: &Credentials) -> Result<(), Error> {
        let path = &self.config.credentials_path;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, serde_json::to_string_pretty(creds)?)
            .wrap_err_with(|| format!("Cannot write {}", path.display()))?;

        tracing::debug!("Saved Dropbox credentials to {}", path.display());

        Ok(())
    }

    pub fn authorize_url(&self) -> String {
        let oauth2_flow = Oauth2Type::AuthorizationCode {
            client_secret: self.config.app_secret.clone(),
        };

        // Offline access, otherwise no refresh token is issued.
        AuthorizeUrlBuilder::new(&self.config.app_key, &oauth2_flow)
            .token_type(TokenType::ShortLivedAndRefresh)
            .build()
            .to_string()
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, Error> {
        let mut form: Vec<(&str, &str)> = grant.to_vec();
        form.push(("client_id", self.config.app_key.as_str()));
        form.push(("client_secret", self.config.app_secret.as_str()));

        let res = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .wrap_err("Token request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Token endpoint rejected the request ({status}): {body}");
        }

        res.json().await.wrap_err("Malformed token response")
    }

    /// Trade a one-time authorization code for an access/refresh token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials, Error> {
        let token = self
            .request_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await
            .wrap_err("Authorization code rejected")?;

        Ok(Credentials {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .filter(|t| !t.is_empty())
                .wrap_err("Token response carries no refresh token")?,
        })
    }

    /// Short-lived access token for a stored refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, Error> {
        if refresh_token.trim().is_empty() {
            bail!("Stored refresh token is empty");
        }

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
            .wrap_err("Refresh token rejected")?;

        Ok(token.access_token)
    }

    pub async fn bootstrap_authorization(&self) -> Result<Credentials, Error> {
        let url = self.authorize_url();

        let authcode = self.prompt.prompt_code(&url)?;
        let authcode = authcode.trim();
        if authcode.is_empty() {
            bail!("No authorization code entered");
        }

        let creds = self.exchange_code(authcode).await?;
        self.save_credentials(&creds)?;

        Ok(creds)
    }

    /// Stored credentials, or a fresh interactive authorization when none exist.
    pub async fn credentials(&self) -> Result<Credentials, Error> {
        match self.load_credentials()? {
            Some(creds) => Ok(creds),
            None => {
                tracing::info!("No stored Dropbox credentials, starting authorization");
                self.bootstrap_authorization()
                    .await
                    .wrap_err("Dropbox authorization failed")
            }
        }
    }

    /// A stored but unusable refresh token is an error here; it does not
    /// trigger a new authorization.
    pub async fn get_client(&self) -> Result<DropboxApi, Error> {
        let creds = self.credentials().await?;
        let access_token = self
            .refresh_access_token(&creds.refresh_token)
            .await
            .wrap_err("Error creating Dropbox client")?;

        let tokens = TokenCache::new(Authorization::from_client_secret_refresh_token(
            self.config.app_key.clone(),
            self.config.app_secret.clone(),
            creds.refresh_token,
        ));
        tokens.set_access_token(access_token);

        Ok(DropboxApi::new(UserAuthDefaultClient::from_token_cache(
            Arc::new(tokens),
        )))
    }
}
