use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.jobs_directory.is_empty() {
        return Err(ConfigError::Validation {
            message: "jobs_directory must not be empty".to_string(),
        });
    }

    if config.composite_group.is_empty() {
        return Err(ConfigError::Validation {
            message: "composite_group must not be empty".to_string(),
        });
    }

    if config.remote.host.is_empty() || config.remote.user.is_empty() {
        return Err(ConfigError::Validation {
            message: "remote.host and remote.user must not be empty".to_string(),
        });
    }

    if config.remote.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "remote.connect_timeout_secs must be at least 1".to_string(),
        });
    }

    if !has_secret_source(
        config.remote.password.as_deref(),
        config.remote.password_file.as_deref(),
        config.remote.password_env.as_deref(),
    ) {
        return Err(ConfigError::Validation {
            message: "remote password needs one of: password, password_file, password_env"
                .to_string(),
        });
    }

    if config.chat.api_base.is_empty() {
        return Err(ConfigError::Validation {
            message: "chat.api_base must not be empty".to_string(),
        });
    }

    if !has_secret_source(
        config.chat.webhook_url.as_deref(),
        config.chat.webhook_url_file.as_deref(),
        config.chat.webhook_url_env.as_deref(),
    ) {
        return Err(ConfigError::Validation {
            message: "chat webhook needs one of: webhook_url, webhook_url_file, webhook_url_env"
                .to_string(),
        });
    }

    if !has_secret_source(
        config.chat.token.as_deref(),
        config.chat.token_file.as_deref(),
        config.chat.token_env.as_deref(),
    ) {
        return Err(ConfigError::Validation {
            message: "chat token needs one of: token, token_file, token_env".to_string(),
        });
    }

    Ok(())
}
