//! Error types for cert-tweaks

use std::io;
use std::path::PathBuf;

/// Main error type for the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read certificate file '{}': {source}", path.display())]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Trust augmenter is already installed")]
    AlreadyInstalled,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn tls(msg: impl Into<String>) -> Self {
        Error::Tls(msg.into())
    }

    pub fn certificate_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::CertificateRead {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
