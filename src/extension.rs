//! Host-facing lifecycle: activate, reload on change, deactivate.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::Config;
use crate::error::Result;
use crate::loader::{CertificateLoader, EnvLookup, LoadReport};
use crate::notification::{Notification, Notifier, TracingNotifier};
use crate::trust::{TrustAugmenter, TrustList, TrustSlot};
use crate::watch::ConfigWatcher;

#[derive(Default)]
struct ReloadState {
    first_load_done: bool,
}

/// One cert-tweaks instance, held by the host for as long as it should
/// trust the extra certificates.
pub struct CertTweaks {
    slot: Arc<TrustSlot>,
    trust_list: TrustList,
    loader: CertificateLoader,
    augmenter: TrustAugmenter,
    notifier: Arc<dyn Notifier>,
    reload: Mutex<ReloadState>,
    subscriptions: Mutex<Vec<ConfigWatcher>>,
}

impl CertTweaks {
    /// Create an instance that decorates `slot` and reports through tracing
    pub fn new(slot: Arc<TrustSlot>) -> Self {
        Self::with_notifier(slot, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(slot: Arc<TrustSlot>, notifier: Arc<dyn Notifier>) -> Self {
        let trust_list = TrustList::new();
        Self {
            loader: CertificateLoader::new(notifier.clone()),
            augmenter: TrustAugmenter::new(trust_list.clone(), notifier.clone()),
            slot,
            trust_list,
            notifier,
            reload: Mutex::new(ReloadState::default()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Replace the environment lookup used for `NODE_EXTRA_CA_CERTS`
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.loader = self.loader.with_env(env);
        self
    }

    fn reload_state(&self) -> MutexGuard<'_, ReloadState> {
        self.reload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Perform the first load, which also installs the trust decorator.
    pub fn activate(&self, config: &Config) -> LoadReport {
        self.reload_state().first_load_done = false;
        self.reload(config)
    }

    /// Rebuild the trust list from `config`.
    ///
    /// Reloads are serialized; the list is swapped in whole. The decorator is
    /// installed after the first load only.
    pub fn reload(&self, config: &Config) -> LoadReport {
        let mut state = self.reload_state();

        let report = self.loader.load(&config.certs);
        self.trust_list.replace(report.blobs.clone());

        if !state.first_load_done {
            state.first_load_done = true;
            if let Err(e) = self.augmenter.install(&self.slot) {
                tracing::warn!(error = %e, "Trust augmenter not installed");
            }
        }

        report
    }

    /// Re-read the configuration file and reload.
    ///
    /// An unreadable or invalid file is reported and the current trust list
    /// is kept.
    pub fn reload_from_file(&self, path: &std::path::Path) -> Result<LoadReport> {
        match Config::from_file(path) {
            Ok(config) => Ok(self.reload(&config)),
            Err(e) => {
                tracing::error!(error = %e, "Config reload failed");
                self.notifier.notify(
                    Notification::error(
                        "Unable to load cert-tweaks configuration",
                        format!("Keeping the previous certificates; check \"{}\"", path.display()),
                    )
                    .with_cause(&e),
                );
                Err(e)
            }
        }
    }

    /// Reload whenever the configuration file at `path` changes.
    ///
    /// The subscription is released by [`CertTweaks::deactivate`].
    pub fn watch(self: &Arc<Self>, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let this: Weak<Self> = Arc::downgrade(self);
        let reload_path = path.clone();
        let watcher = ConfigWatcher::spawn(path, move || {
            if let Some(this) = this.upgrade() {
                let _ = this.reload_from_file(&reload_path);
            }
        })?;

        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(watcher);
        Ok(())
    }

    /// Remove the decorator and drop all subscriptions
    pub fn deactivate(&self) {
        let watchers: Vec<ConfigWatcher> = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        drop(watchers);
        self.augmenter.uninstall();
        tracing::debug!("cert-tweaks deactivated");
    }

    pub fn trust_list(&self) -> &TrustList {
        &self.trust_list
    }

    pub fn slot(&self) -> &Arc<TrustSlot> {
        &self.slot
    }

    pub fn is_installed(&self) -> bool {
        self.augmenter.is_installed()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
