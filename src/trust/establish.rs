//! The trust-establishment seam and the host-owned slot that routes it.

use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Outcome of populating a root store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustSummary {
    /// Trust anchors accepted by the store
    pub added: usize,
    /// Entries the store rejected
    pub ignored: usize,
}

/// Populates a root store with trust anchors.
///
/// This is the operation a host runs every time it creates a new TLS client
/// context. Closures of the right shape implement it too.
pub trait EstablishTrust: Send + Sync {
    fn establish_trust(&self, store: &mut RootCertStore) -> TrustSummary;

    /// For a decorator that has been detached and now only forwards, the
    /// establisher it forwards to.
    fn detached_inner(&self) -> Option<SharedEstablisher> {
        None
    }
}

impl<F> EstablishTrust for F
where
    F: Fn(&mut RootCertStore) -> TrustSummary + Send + Sync,
{
    fn establish_trust(&self, store: &mut RootCertStore) -> TrustSummary {
        self(store)
    }
}

pub type SharedEstablisher = Arc<dyn EstablishTrust>;

/// Installs the Mozilla root program shipped with `webpki-roots`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRoots;

impl EstablishTrust for DefaultRoots {
    fn establish_trust(&self, store: &mut RootCertStore) -> TrustSummary {
        let before = store.len();
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        TrustSummary {
            added: store.len().saturating_sub(before),
            ignored: 0,
        }
    }
}

/// Routing point for trust establishment, owned by the host.
///
/// Every secure context the host creates is populated through
/// [`TrustSlot::establish_trust`], which calls whatever establisher is
/// currently installed.
pub struct TrustSlot {
    current: RwLock<SharedEstablisher>,
}

impl TrustSlot {
    pub fn new(establisher: impl EstablishTrust + 'static) -> Self {
        Self::from_shared(Arc::new(establisher))
    }

    pub fn from_shared(establisher: SharedEstablisher) -> Self {
        Self {
            current: RwLock::new(establisher),
        }
    }

    /// The establisher calls are currently routed to
    pub fn current(&self) -> SharedEstablisher {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new establisher, returning the previous one
    pub fn replace(&self, establisher: SharedEstablisher) -> SharedEstablisher {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, establisher)
    }

    /// Replace the current establisher with `wrap(current)` under a single
    /// write lock. Returns the establisher that was replaced and the wrapper.
    pub fn wrap<E, F>(&self, wrap: F) -> (SharedEstablisher, Arc<E>)
    where
        E: EstablishTrust + 'static,
        F: FnOnce(SharedEstablisher) -> Arc<E>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let original = guard.clone();
        let wrapper = wrap(original.clone());
        *guard = wrapper.clone();
        (original, wrapper)
    }

    /// Undo a [`TrustSlot::wrap`].
    ///
    /// When `wrapper` is still the current establisher it is swapped for
    /// `original`, skipping over detached decorators, and `true` is returned.
    /// Otherwise something has been layered on top: the slot is left alone
    /// and `on_buried` runs while the write lock is still held.
    pub fn unwrap_layer<F>(
        &self,
        wrapper: &SharedEstablisher,
        original: SharedEstablisher,
        on_buried: F,
    ) -> bool
    where
        F: FnOnce(),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(&*guard, wrapper) {
            on_buried();
            return false;
        }

        let mut restored = original;
        while let Some(inner) = restored.detached_inner() {
            restored = inner;
        }
        *guard = restored;
        true
    }

    /// Populate `store` using the current establisher.
    ///
    /// The slot lock is not held while the establisher runs.
    pub fn establish_trust(&self, store: &mut RootCertStore) -> TrustSummary {
        self.current().establish_trust(store)
    }
}

impl Default for TrustSlot {
    fn default() -> Self {
        Self::new(DefaultRoots)
    }
}

impl fmt::Debug for TrustSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustSlot").finish_non_exhaustive()
    }
}

/// Register the certificates contained in `data` as trust anchors.
///
/// PEM `CERTIFICATE` sections are added one by one; data without any PEM
/// section is handed to the store as a single DER certificate. Whatever the
/// store cannot parse is counted in `ignored`.
pub fn add_ca_cert(store: &mut RootCertStore, data: &[u8]) -> TrustSummary {
    let mut ders: Vec<CertificateDer<'static>> = Vec::new();
    let mut malformed = 0;
    for item in rustls_pemfile::certs(&mut &data[..]) {
        match item {
            Ok(der) => ders.push(der),
            Err(_) => malformed += 1,
        }
    }

    if ders.is_empty() && malformed == 0 {
        ders.push(CertificateDer::from(data.to_vec()));
    }

    let (added, ignored) = store.add_parsable_certificates(ders);
    TrustSummary {
        added,
        ignored: ignored + malformed,
    }
}
