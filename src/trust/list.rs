//! Certificate sources, blobs and the shared trust list

use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Where a certificate blob comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// An entry of `extraCerts`
    File(PathBuf),
    /// The file named by an environment variable
    Env { var: String, path: PathBuf },
}

impl CertificateSource {
    pub fn path(&self) -> &Path {
        match self {
            CertificateSource::File(path) => path,
            CertificateSource::Env { path, .. } => path,
        }
    }
}

impl fmt::Display for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateSource::File(path) => write!(f, "{}", path.display()),
            CertificateSource::Env { var, path } => write!(f, "{} (${})", path.display(), var),
        }
    }
}

/// Raw, unparsed bytes of a certificate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBlob {
    source: CertificateSource,
    data: Bytes,
}

impl CertificateBlob {
    pub fn new(source: CertificateSource, data: impl Into<Bytes>) -> Self {
        Self {
            source,
            data: data.into(),
        }
    }

    pub fn source(&self) -> &CertificateSource {
        &self.source
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Shared, ordered list of extra certificates.
///
/// Clones share the same list. `replace` swaps the whole list in one step,
/// so a reader sees either the old or the new contents, never a mix.
#[derive(Debug, Clone, Default)]
pub struct TrustList {
    inner: Arc<RwLock<Arc<[CertificateBlob]>>>,
}

impl TrustList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list
    pub fn replace(&self, blobs: Vec<CertificateBlob>) {
        let blobs: Arc<[CertificateBlob]> = blobs.into();
        match self.inner.write() {
            Ok(mut guard) => *guard = blobs,
            Err(poisoned) => *poisoned.into_inner() = blobs,
        }
    }

    /// Current contents; cheap, the lock is released before returning.
    pub fn snapshot(&self) -> Arc<[CertificateBlob]> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
