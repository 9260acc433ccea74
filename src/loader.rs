//! Resolves configured certificate sources into blobs

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{CertsConfig, EXTRA_CA_CERTS_ENV};
use crate::error::{Error, Result};
use crate::notification::{Notification, Notifier};
use crate::trust::{CertificateBlob, CertificateSource};

/// Looks up an environment variable by name
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<OsString> + Send + Sync>;

/// Result of one load pass
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Blobs that were read, env-sourced first, then `extraCerts` in order
    pub blobs: Vec<CertificateBlob>,
    /// One entry per source that could not be read
    pub failures: Vec<Error>,
}

/// Reads certificate files named by the configuration.
pub struct CertificateLoader {
    notifier: Arc<dyn Notifier>,
    env: EnvLookup,
}

impl CertificateLoader {
    /// A loader that reads the process environment
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            env: Arc::new(|name: &str| std::env::var_os(name)),
        }
    }

    /// Replace the environment lookup
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// The ordered list of sources a load would read
    pub fn sources(&self, config: &CertsConfig) -> Vec<CertificateSource> {
        let mut sources = Vec::with_capacity(config.extra_certs.len() + 1);

        if config.emulate_extra_ca_certs {
            match (self.env)(EXTRA_CA_CERTS_ENV) {
                Some(value) if !value.is_empty() => sources.push(CertificateSource::Env {
                    var: EXTRA_CA_CERTS_ENV.to_string(),
                    path: PathBuf::from(value),
                }),
                _ => tracing::debug!(
                    var = EXTRA_CA_CERTS_ENV,
                    "Emulation enabled but variable is unset or empty"
                ),
            }
        }

        sources.extend(config.extra_certs.iter().cloned().map(CertificateSource::File));
        sources
    }

    /// Read every configured source.
    ///
    /// A source that fails to read is reported to the notifier and skipped;
    /// the rest are still loaded.
    pub fn load(&self, config: &CertsConfig) -> LoadReport {
        let mut report = LoadReport::default();

        for source in self.sources(config) {
            match read_source(&source) {
                Ok(blob) => {
                    tracing::debug!(source = %source, bytes = blob.len(), "Certificate file loaded");
                    report.blobs.push(blob);
                }
                Err(e) => {
                    let mut note = Notification::error(
                        "Unable to read certificate file",
                        format!(
                            "cert-tweaks failed to read the file: \"{}\"",
                            source.path().display()
                        ),
                    );
                    if let Error::CertificateRead { source: io, .. } = &e {
                        note = note.with_cause(io);
                    }
                    self.notifier.notify(note);
                    report.failures.push(e);
                }
            }
        }

        tracing::info!(
            loaded = report.blobs.len(),
            failed = report.failures.len(),
            "Extra certificates loaded"
        );
        report
    }
}

/// Read the full contents of a single source
pub fn read_source(source: &CertificateSource) -> Result<CertificateBlob> {
    let path = source.path();
    let data = std::fs::read(path).map_err(|e| Error::certificate_read(path, e))?;
    Ok(CertificateBlob::new(source.clone(), data))
}
