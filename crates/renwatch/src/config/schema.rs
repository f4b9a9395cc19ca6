use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root folder the render manager drops job folders under.
    pub jobs_directory: String,
    /// Folders whose name contains this keyword (case-insensitive) are
    /// skipped before any parsing.
    #[serde(default = "default_exclude_keyword")]
    pub exclude_keyword: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Status-group label marking composite multi-sub-job images.
    #[serde(default = "default_composite_group")]
    pub composite_group: String,
    pub remote: RemoteConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_exclude_keyword() -> String {
    "ANIMA".to_string()
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|dir| {
            dir.join("renwatch")
                .join("renwatch.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "renwatch.db".to_string())
}

fn default_composite_group() -> String {
    "P00".to_string()
}

/// FTP endpoint previews are published to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    /// Remote directory refreshed previews of awaiting-approval images
    /// land in.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Remote prefix for previews published in the normal flow.
    #[serde(default = "default_preview_prefix")]
    pub preview_prefix: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_ftp_port() -> u16 {
    21
}

fn default_base_path() -> String {
    "/www/sistema/uploads/renders/".to_string()
}

fn default_preview_prefix() -> String {
    "previas/".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Chat service the notifier talks to (channel webhook + bot API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_url_file: Option<String>,
    #[serde(default)]
    pub webhook_url_env: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_file: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub duplicate_recipients: DuplicatePolicy,
}

/// What to do when a responsible party resolves to more than one chat
/// identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Message only the first resolved identity.
    First,
    /// Message every resolved identity.
    #[default]
    FanOut,
    /// Treat duplicates as a data error: log and send no direct message.
    Error,
}
