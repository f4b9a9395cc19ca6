//! Slack-backed chat gateway.
//!
//! The channel broadcast goes through an incoming webhook; direct
//! messages go through the Web API (`users.list` to resolve a display
//! name, `chat.postMessage` to deliver).

use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ChatGateway, NotifyError};
use crate::config::ChatConfig;
use crate::secrets::resolve_secret;

/// Default connect timeout for chat HTTP requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response of the `users.list` API call.
#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,

    #[serde(default)]
    error: Option<String>,

    #[serde(default)]
    members: Vec<UserEntry>,
}

/// One workspace member as returned by `users.list`.
#[derive(Debug, Deserialize)]
struct UserEntry {
    id: String,

    #[serde(default)]
    real_name: Option<String>,
}

/// Response of the `chat.postMessage` API call.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,

    #[serde(default)]
    error: Option<String>,
}

/// Chat gateway talking to Slack.
pub struct SlackGateway {
    client: Client,
    webhook_url: SecretString,
    token: SecretString,
    api_base: String,
}

impl SlackGateway {
    /// Builds a gateway from the chat section of the configuration,
    /// resolving the webhook URL and API token from their sources.
    pub fn from_config(chat: &ChatConfig) -> Result<Self, NotifyError> {
        let webhook_url = resolve_secret(
            "chat webhook URL",
            chat.webhook_url.as_deref(),
            chat.webhook_url_file.as_deref(),
            chat.webhook_url_env.as_deref(),
        )?;
        let token = resolve_secret(
            "chat API token",
            chat.token.as_deref(),
            chat.token_file.as_deref(),
            chat.token_env.as_deref(),
        )?;
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(chat.request_timeout_secs))
            .build()
            .map_err(NotifyError::ClientBuild)?;

        Ok(Self {
            client,
            webhook_url,
            token,
            api_base: chat.api_base.trim_end_matches('/').to_string(),
        })
    }
}

impl ChatGateway for SlackGateway {
    fn broadcast(&self, message: &str) -> Result<(), NotifyError> {
        // The webhook URL embeds a credential; error text refers to it
        // by role instead.
        let response = self
            .client
            .post(self.webhook_url.expose_secret())
            .json(&serde_json::json!({ "text": message }))
            .send()
            .map_err(|e| NotifyError::Http {
                url: "incoming webhook".to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Api {
                method: "webhook".to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }

    fn resolve_user(&self, display_name: &str) -> Result<Option<String>, NotifyError> {
        let url = format!("{}/users.list", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .map_err(|e| NotifyError::Http {
                url: url.clone(),
                source: e,
            })?;
        let body: UsersListResponse = response.json().map_err(|e| NotifyError::Http {
            url: url.clone(),
            source: e,
        })?;

        if !body.ok {
            return Err(NotifyError::Api {
                method: "users.list".to_string(),
                reason: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(member_id_for(&body.members, display_name))
    }

    fn direct_message(&self, user_id: &str, message: &str) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({ "channel": user_id, "text": message }))
            .send()
            .map_err(|e| NotifyError::Http {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let body: PostMessageResponse = response.json().map_err(|e| NotifyError::Http {
            url: url.clone(),
            source: e,
        })?;

        if !status.is_success() || !body.ok {
            return Err(NotifyError::Api {
                method: "chat.postMessage".to_string(),
                reason: body.error.unwrap_or_else(|| format!("HTTP {}", status)),
            });
        }
        Ok(())
    }
}

/// First member whose real name matches case-insensitively.
fn member_id_for(members: &[UserEntry], display_name: &str) -> Option<String> {
    let wanted = display_name.to_lowercase();
    members
        .iter()
        .find(|m| {
            m.real_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase() == wanted)
        })
        .map(|m| m.id.clone())
}
