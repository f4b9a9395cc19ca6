//! Secret resolution for the external collaborators.
//!
//! The FTP password, the chat webhook URL, and the bot token each resolve
//! from one of three sources in priority order:
//!
//! 1. **Inline value** - quick local testing (e.g. `"password": "hunter2"`)
//! 2. **File reference** - Docker secrets pattern (e.g. `/run/secrets/ftp_pass`)
//! 3. **Env var reference** - production deployments (e.g. `RENWATCH_FTP_PASS`)

use std::fs;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No source configured for secret '{name}' (need one of: value, file path, or env var)")]
    NoSourceProvided { name: String },

    #[error("Failed to read secret '{name}' from file '{path}': {source}")]
    FileReadError {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{var}' for secret '{name}' not set")]
    EnvVarNotSet { name: String, var: String },

    #[error("Environment variable '{var}' for secret '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String, var: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolve the secret called `name` from the first non-empty source, in
/// order: inline value, file contents (trimmed), environment variable
/// (trimmed). Errors carry the secret name so startup failures point at
/// the right config entry.
pub fn resolve_secret(
    name: &str,
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return match fs::read_to_string(&expanded) {
            Ok(content) => Ok(SecretString::from(content.trim().to_string())),
            Err(e) => Err(SecretError::FileReadError {
                name: name.to_string(),
                path: expanded,
                source: e,
            }),
        };
    }

    if let Some(var) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var) {
            // Env vars may carry trailing newlines from shell heredocs
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
                var: var.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
                var: var.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided {
        name: name.to_string(),
    })
}

/// True when at least one source is configured (non-empty). Used by
/// config validation so a missing secret fails at startup rather than
/// mid-walk.
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory. `~user/path`
/// syntax is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
