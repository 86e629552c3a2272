use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_with::serde_as;

const APP_DIR: &str = "volunteer-log";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub sheets: SheetsSettings,
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_sheets_api_url")]
    pub api_url: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    /// Installed-app clients get a secret that isn't really secret; some
    /// providers still require it on the token endpoint.
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
    /// Whether a submission may open the browser to sign in again.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_true")]
    pub interactive: bool,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("callback_port", &self.callback_port)
            .field("login_timeout_secs", &self.login_timeout_secs)
            .field("refresh_timeout_secs", &self.refresh_timeout_secs)
            .field("interactive", &self.interactive)
            .finish()
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StorageSettings {
    /// Where the pending queue and session files live.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_sheets_api_url() -> String {
    sheets::DEFAULT_SHEETS_API_URL.to_string()
}

fn default_delivery_timeout_secs() -> u64 {
    15
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_callback_port() -> u16 {
    9876
}

fn default_login_timeout_secs() -> u64 {
    120
}

fn default_refresh_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl SheetsSettings {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

impl OAuthSettings {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Settings {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join(APP_DIR)
        .join("config.toml"))
}

pub fn default_data_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("Cannot determine data directory")?
        .join(APP_DIR))
}

/// Load settings from the user config file (if any) and the environment.
///
/// Environment variables use the `VOLUNTEER_LOG` prefix and `__` between
/// nested keys, e.g. `VOLUNTEER_LOG_SHEETS__SPREADSHEET_ID`.
pub fn read_config() -> Result<Settings> {
    read_config_from(&config_path()?)
}

pub fn read_config_from(path: &Path) -> Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("VOLUNTEER_LOG")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    settings
        .try_deserialize::<Settings>()
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Write a starter config file if none exists yet.
pub fn write_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    Ok(true)
}

const CONFIG_TEMPLATE: &str = r#"log_level = "info"

[sheets]
spreadsheet_id = ""
sheet_name = "Sheet1"

[oauth]
client_id = ""
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [sheets]
            spreadsheet_id = "doc-123"

            [oauth]
            client_id = "client.apps.example"
            "#,
        )
        .unwrap();

        let settings = read_config_from(&path).unwrap();

        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.sheets.spreadsheet_id, "doc-123");
        assert_eq!(settings.sheets.sheet_name, "Sheet1");
        assert_eq!(settings.sheets.delivery_timeout(), Duration::from_secs(15));
        assert_eq!(settings.oauth.client_id, "client.apps.example");
        assert_eq!(settings.oauth.client_secret, None);
        assert_eq!(settings.oauth.callback_port, 9876);
        assert_eq!(settings.oauth.refresh_timeout(), Duration::from_secs(15));
        assert!(settings.oauth.interactive);
        assert!(settings.storage.data_dir.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            log_level = "debug"

            [sheets]
            spreadsheet_id = "doc"
            sheet_name = "Hours 2024"
            delivery_timeout_secs = 5

            [oauth]
            client_id = "id"
            client_secret = "shh"
            callback_port = 8123
            interactive = false

            [storage]
            data_dir = "/tmp/volunteer"
            "#,
        )
        .unwrap();

        let settings = read_config_from(&path).unwrap();

        assert_eq!(settings.sheets.sheet_name, "Hours 2024");
        assert_eq!(settings.sheets.delivery_timeout_secs, 5);
        assert_eq!(settings.oauth.callback_port, 8123);
        assert!(!settings.oauth.interactive);
        assert_eq!(
            settings.data_dir().unwrap(),
            PathBuf::from("/tmp/volunteer")
        );
        assert!(!format!("{:?}", settings.oauth).contains("shh"));
    }

    #[test]
    fn template_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        assert!(write_template(&path).unwrap());
        assert!(!write_template(&path).unwrap());
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("[sheets]"));
    }
}
