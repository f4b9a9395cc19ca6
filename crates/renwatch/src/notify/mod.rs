//! Responsible-party notification.
//!
//! One status change produces one notification round: a channel-wide
//! broadcast, a direct message to the responsible collaborator's chat
//! account(s) and an audit row in `notificacoes`. Delivery failures are
//! logged and do not undo the audit trail; the round either happens for
//! a status or it does not.

use thiserror::Error;

use crate::config::DuplicatePolicy;
use crate::db::{notify_repo, Database, DatabaseError};
use crate::secrets::SecretError;
use crate::status::RenderStatus;

pub mod slack;

pub use slack::SlackGateway;

/// Errors from the notification path.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The HTTP client could not be constructed.
    #[error("Could not build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Transport-level failure talking to the chat service.
    #[error("Request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The chat service accepted the request but reported an error.
    #[error("Chat API '{method}' rejected the call: {reason}")]
    Api { method: String, reason: String },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Chat service seam. Implemented by [`SlackGateway`] in production and
/// by recording fakes in tests.
pub trait ChatGateway {
    /// Posts a message to the shared render channel.
    fn broadcast(&self, message: &str) -> Result<(), NotifyError>;

    /// Resolves a display name to a chat user id, if one matches.
    fn resolve_user(&self, display_name: &str) -> Result<Option<String>, NotifyError>;

    /// Sends a direct message to a resolved user id.
    fn direct_message(&self, user_id: &str, message: &str) -> Result<(), NotifyError>;
}

/// Builds the notification text for a status. Statuses outside the
/// three templated ones stay silent.
pub fn message_for(status: &RenderStatus, image_name: &str) -> Option<String> {
    match status {
        RenderStatus::Failed => Some(format!(
            "O render da imagem: {} deu erro, favor verificar!",
            image_name
        )),
        RenderStatus::AwaitingApproval => Some(format!(
            "O render da imagem: {} foi concluído com sucesso, favor aprovar!",
            image_name
        )),
        RenderStatus::InProgress => Some(format!(
            "O render da imagem: {} está em andamento.",
            image_name
        )),
        _ => None,
    }
}

/// Runs full notification rounds against a chat gateway and the audit
/// trail.
pub struct Notifier<'a> {
    db: &'a Database,
    gateway: &'a dyn ChatGateway,
    policy: DuplicatePolicy,
}

impl<'a> Notifier<'a> {
    pub fn new(db: &'a Database, gateway: &'a dyn ChatGateway, policy: DuplicatePolicy) -> Self {
        Self {
            db,
            gateway,
            policy,
        }
    }

    /// Issues one notification round for a status change on an image.
    ///
    /// Returns `Ok(false)` when the status has no template (silent).
    /// Chat delivery failures are logged and skipped; the audit row is
    /// written whenever a templated message exists.
    pub fn notify(
        &self,
        colaborador_id: i64,
        status: &RenderStatus,
        image_name: &str,
    ) -> Result<bool, NotifyError> {
        let Some(message) = message_for(status, image_name) else {
            return Ok(false);
        };

        if let Err(e) = self.gateway.broadcast(&message) {
            tracing::warn!("Channel broadcast failed: {}", e);
        }

        let names = notify_repo::slack_names(self.db, colaborador_id)?;
        let mut user_ids: Vec<String> = Vec::new();
        for name in &names {
            match self.gateway.resolve_user(name) {
                Ok(Some(id)) => {
                    if !user_ids.contains(&id) {
                        user_ids.push(id);
                    }
                }
                Ok(None) => {
                    tracing::warn!("No chat user found for display name '{}'", name);
                }
                Err(e) => {
                    tracing::warn!("Could not resolve chat user '{}': {}", name, e);
                }
            }
        }

        let recipients: Vec<String> = match self.policy {
            DuplicatePolicy::FanOut => user_ids,
            DuplicatePolicy::First => user_ids.into_iter().take(1).collect(),
            DuplicatePolicy::Error => {
                if user_ids.len() > 1 {
                    // Data error in the user table: the broadcast and the
                    // audit row still go out, the direct messages do not.
                    tracing::warn!(
                        "Collaborator {} resolves to {} chat users; suppressing direct messages",
                        colaborador_id,
                        user_ids.len()
                    );
                    Vec::new()
                } else {
                    user_ids
                }
            }
        };

        for user_id in &recipients {
            match self.gateway.direct_message(user_id, &message) {
                Ok(()) => tracing::info!("Direct message delivered to {}", user_id),
                Err(e) => tracing::warn!("Direct message to {} failed: {}", user_id, e),
            }
        }

        notify_repo::insert(self.db, colaborador_id, &message)?;
        Ok(true)
    }
}
