//! OAuth tokens for one Google account.
//!
//! icsport doesn't run the consent flow. The token file at
//! `~/.config/icsport/google/session/<account>.toml` is provisioned once and
//! kept fresh from here on.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::app_config::{AppConfig, base_dir};

/// Tokens this close to expiry are refreshed before an import starts.
const EXPIRY_MARGIN_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredTokens {
    /// Google usually omits the refresh token on refresh; keep the old one then.
    fn refreshed(token: &AccessToken, previous_refresh_token: &str, now: DateTime<Utc>) -> Self {
        let refresh_token = if token.refresh_token.is_empty() {
            previous_refresh_token.to_string()
        } else {
            token.refresh_token.clone()
        };

        StoredTokens {
            access_token: token.access_token.clone(),
            refresh_token,
            expires_at: now + Duration::seconds(token.expires_in),
        }
    }

    fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        now + margin >= self.expires_at
    }
}

pub struct Session {
    account: String,
    path: PathBuf,
    tokens: StoredTokens,
}

impl Session {
    pub fn token_path(account: &str) -> Result<PathBuf> {
        let file_name = account.replace(['/', '\\', ':', ' '], "_");
        Ok(base_dir()?.join("session").join(format!("{}.toml", file_name)))
    }

    /// A client for `account` whose access token is good for the next while.
    pub async fn authorized_client(account: &str) -> Result<Client> {
        let app = AppConfig::load()?;
        let mut session = Self::open_at(account, Self::token_path(account)?)?;

        if session
            .tokens
            .expires_within(Duration::seconds(EXPIRY_MARGIN_SECS), Utc::now())
        {
            log::info!("Refreshing Google access token for {}", account);
            session.refresh(&app).await?;
        }

        Ok(session.client(&app))
    }

    fn open_at(account: &str, path: PathBuf) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "No Google session for {}.\n\n\
                Create {} with:\n\n\
                access_token = \"...\"\n\
                refresh_token = \"...\"\n\
                expires_at = \"2000-01-01T00:00:00Z\"",
                account,
                path.display()
            );
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let tokens: StoredTokens = toml::from_str(&contents)
            .with_context(|| format!("{} is not a valid session file", path.display()))?;

        Ok(Session {
            account: account.to_string(),
            path,
            tokens,
        })
    }

    fn client(&self, app: &AppConfig) -> Client {
        Client::new(
            &app.client_id,
            &app.client_secret,
            "",
            &self.tokens.access_token,
            &self.tokens.refresh_token,
        )
    }

    async fn refresh(&mut self, app: &AppConfig) -> Result<()> {
        let token = self
            .client(app)
            .refresh_access_token()
            .await
            .with_context(|| format!("Failed to refresh the Google session for {}", self.account))?;

        self.tokens = StoredTokens::refreshed(&token, &self.tokens.refresh_token, Utc::now());
        write_private(&self.path, &toml::to_string_pretty(&self.tokens)?)
    }
}

/// Replace `path` with `contents`, readable by the owner only.
fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, contents).with_context(|| format!("Failed to write {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict {}", tmp.display()))?;
    }

    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
}
