//! Decorates the host's trust establishment with the extra certificates.

use rustls::RootCertStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::establish::{add_ca_cert, EstablishTrust, SharedEstablisher, TrustSlot, TrustSummary};
use super::list::TrustList;
use crate::error::{Error, Result};
use crate::notification::{Notification, Notifier};

/// Runs the wrapped establisher, then adds every blob of the trust list to
/// the same store. The wrapped establisher's summary is returned untouched.
///
/// Once detached it only forwards to the wrapped establisher.
pub struct AugmentedTrust {
    inner: SharedEstablisher,
    trust_list: TrustList,
    detached: AtomicBool,
}

impl AugmentedTrust {
    pub fn new(inner: SharedEstablisher, trust_list: TrustList) -> Self {
        Self {
            inner,
            trust_list,
            detached: AtomicBool::new(false),
        }
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

impl EstablishTrust for AugmentedTrust {
    fn establish_trust(&self, store: &mut RootCertStore) -> TrustSummary {
        let result = self.inner.establish_trust(store);
        if self.is_detached() {
            return result;
        }

        for blob in self.trust_list.snapshot().iter() {
            let extra = add_ca_cert(store, blob.data());
            if extra.ignored > 0 {
                tracing::debug!(
                    source = %blob.source(),
                    added = extra.added,
                    ignored = extra.ignored,
                    "Trust store rejected certificate data"
                );
            } else {
                tracing::trace!(source = %blob.source(), added = extra.added, "Extra certificate trusted");
            }
        }

        result
    }

    fn detached_inner(&self) -> Option<SharedEstablisher> {
        self.is_detached().then(|| self.inner.clone())
    }
}

struct Installed {
    slot: Arc<TrustSlot>,
    wrapper: Arc<AugmentedTrust>,
    original: SharedEstablisher,
}

/// Installs and removes [`AugmentedTrust`] on a [`TrustSlot`].
pub struct TrustAugmenter {
    trust_list: TrustList,
    notifier: Arc<dyn Notifier>,
    state: Mutex<Option<Installed>>,
}

impl TrustAugmenter {
    pub fn new(trust_list: TrustList, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            trust_list,
            notifier,
            state: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<Installed>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wrap the slot's current establisher.
    ///
    /// Fails with [`Error::AlreadyInstalled`] (after notifying the user) when
    /// called while installed; the slot is left as it is.
    pub fn install(&self, slot: &Arc<TrustSlot>) -> Result<()> {
        let mut state = self.state();
        if state.is_some() {
            self.notifier.notify(Notification::error(
                "cert-tweaks internal error",
                "Attempt to install the trust augmenter twice",
            ));
            return Err(Error::AlreadyInstalled);
        }

        let trust_list = self.trust_list.clone();
        let (original, wrapper) =
            slot.wrap(move |inner| Arc::new(AugmentedTrust::new(inner, trust_list)));
        *state = Some(Installed {
            slot: slot.clone(),
            wrapper,
            original,
        });

        tracing::info!(certificates = self.trust_list.len(), "Trust augmenter installed");
        Ok(())
    }

    /// Put the original establisher back. Does nothing when not installed.
    ///
    /// If another decorator was installed on top in the meantime, the slot
    /// is left alone and this decorator turns into a pass-through. The
    /// decorator above then restores past it when it is removed.
    pub fn uninstall(&self) {
        let Some(Installed {
            slot,
            wrapper,
            original,
        }) = self.state().take()
        else {
            return;
        };

        let shared: SharedEstablisher = wrapper.clone();
        if slot.unwrap_layer(&shared, original, || wrapper.detach()) {
            tracing::info!("Trust augmenter removed");
        } else {
            tracing::info!("Trust augmenter detached below another decorator");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.state().is_some()
    }
}

impl Drop for TrustAugmenter {
    fn drop(&mut self) {
        self.uninstall();
    }
}
