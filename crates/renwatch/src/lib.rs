pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod joblog;
pub mod manifest;
pub mod notify;
pub mod publish;
pub mod resolve;
pub mod scanner;
pub mod secrets;
pub mod status;
pub mod timestamp;

pub use config::{load_config, Config, DuplicatePolicy};
pub use db::Database;
pub use engine::{Reconciler, RunOptions, RunSummary};
pub use error::{ConfigError, ManifestError, RenwatchError, Result, ScanError};
pub use notify::{ChatGateway, Notifier, NotifyError, SlackGateway};
pub use publish::{FtpPublisher, PreviewTransport, TransferError};
pub use scanner::JobFolderScanner;
pub use secrets::{resolve_secret, SecretError};
pub use status::{classify, RenderStatus};
