//! Preview publication.
//!
//! Discovered preview JPGs are pushed to the remote web store over FTP.
//! Each upload opens a fresh connection with a bounded connect timeout
//! and closes it on every exit path, so a stalled transfer can never
//! wedge the rest of the run.

use std::fs::File;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::secrets::{resolve_secret, SecretError};

/// Errors from publishing a preview to the remote store.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The configured host name did not resolve.
    #[error("Could not resolve FTP host '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The host resolved to no usable address.
    #[error("FTP host '{host}' resolved to no address")]
    NoAddress { host: String },

    /// TCP/FTP handshake failure.
    #[error("Could not connect to FTP host '{host}': {source}")]
    Connect {
        host: String,
        #[source]
        source: FtpError,
    },

    /// Authentication was rejected.
    #[error("FTP login failed for user '{user}': {source}")]
    Login {
        user: String,
        #[source]
        source: FtpError,
    },

    /// A remote directory could not be entered or created.
    #[error("Could not prepare remote directory '{dir}': {source}")]
    RemoteDir {
        dir: String,
        #[source]
        source: FtpError,
    },

    /// The local preview file could not be opened.
    #[error("Could not read local file '{path}': {source}")]
    ReadLocal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload itself failed.
    #[error("FTP transfer of '{remote}' failed: {source}")]
    Store {
        remote: String,
        #[source]
        source: FtpError,
    },
}

/// Pass/fail upload contract the reconciler depends on. Implemented by
/// the FTP publisher in production and by recording fakes in tests.
pub trait PreviewTransport {
    /// Uploads a local file to the given remote path, creating missing
    /// remote directories on demand.
    fn upload(&self, local: &Path, remote: &str) -> Result<(), TransferError>;
}

/// FTP-backed preview publisher.
pub struct FtpPublisher {
    host: String,
    port: u16,
    user: String,
    password: SecretString,
    connect_timeout: Duration,
}

impl FtpPublisher {
    /// Builds a publisher from the remote section of the configuration,
    /// resolving the password from its configured source.
    pub fn from_config(remote: &RemoteConfig) -> Result<Self, SecretError> {
        let password = resolve_secret(
            "FTP password",
            remote.password.as_deref(),
            remote.password_file.as_deref(),
            remote.password_env.as_deref(),
        )?;
        Ok(Self {
            host: remote.host.clone(),
            port: remote.port,
            user: remote.user.clone(),
            password,
            connect_timeout: Duration::from_secs(remote.connect_timeout_secs),
        })
    }

    fn resolve_addr(&self) -> Result<SocketAddr, TransferError> {
        let mut addrs =
            (self.host.as_str(), self.port)
                .to_socket_addrs()
                .map_err(|e| TransferError::Resolve {
                    host: self.host.clone(),
                    source: e,
                })?;
        addrs.next().ok_or_else(|| TransferError::NoAddress {
            host: self.host.clone(),
        })
    }
}

impl PreviewTransport for FtpPublisher {
    fn upload(&self, local: &Path, remote: &str) -> Result<(), TransferError> {
        let addr = self.resolve_addr()?;
        let mut ftp = FtpStream::connect_timeout(addr, self.connect_timeout).map_err(|e| {
            TransferError::Connect {
                host: self.host.clone(),
                source: e,
            }
        })?;

        let result = self.transfer(&mut ftp, local, remote);

        // Close the control connection on every exit path. A failed
        // QUIT after a completed transfer is not worth failing over.
        if let Err(e) = ftp.quit() {
            tracing::debug!("FTP QUIT failed: {}", e);
        }

        result
    }
}

impl FtpPublisher {
    fn transfer(
        &self,
        ftp: &mut FtpStream,
        local: &Path,
        remote: &str,
    ) -> Result<(), TransferError> {
        ftp.login(self.user.as_str(), self.password.expose_secret())
            .map_err(|e| TransferError::Login {
                user: self.user.clone(),
                source: e,
            })?;
        ftp.set_mode(Mode::Passive);
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| TransferError::Connect {
                host: self.host.clone(),
                source: e,
            })?;

        if remote.starts_with('/') {
            ftp.cwd("/").map_err(|e| TransferError::RemoteDir {
                dir: "/".to_string(),
                source: e,
            })?;
        }

        let (dirs, file_name) = remote_components(remote);
        for dir in dirs {
            if ftp.cwd(dir).is_err() {
                ftp.mkdir(dir).map_err(|e| TransferError::RemoteDir {
                    dir: dir.to_string(),
                    source: e,
                })?;
                ftp.cwd(dir).map_err(|e| TransferError::RemoteDir {
                    dir: dir.to_string(),
                    source: e,
                })?;
            }
        }

        let mut reader = File::open(local).map_err(|e| TransferError::ReadLocal {
            path: local.to_path_buf(),
            source: e,
        })?;
        ftp.put_file(file_name, &mut reader)
            .map_err(|e| TransferError::Store {
                remote: remote.to_string(),
                source: e,
            })?;

        tracing::info!("Published preview to {}", remote);
        Ok(())
    }
}

/// Splits a remote path into its directory components and file name.
fn remote_components(remote: &str) -> (Vec<&str>, &str) {
    match remote.rsplit_once('/') {
        Some((dir, file)) => (dir.split('/').filter(|c| !c.is_empty()).collect(), file),
        None => (Vec::new(), remote),
    }
}

/// Picks the preview candidate for a job: the lexicographically first
/// `.jpg` file (any case) in the output directory. Returns the bare
/// file name. A missing or unreadable directory yields `None`.
pub fn find_preview(dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut jpgs: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.to_lowercase().ends_with(".jpg"))
        .collect();
    jpgs.sort();
    jpgs.into_iter().next()
}
