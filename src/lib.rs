//! cert-tweaks - trust extra root certificate authorities
//!
//! This crate lets a host process trust additional root CAs in every TLS
//! client context it creates. Certificate files are listed in configuration
//! (plus, optionally, the file named by `NODE_EXTRA_CA_CERTS`); their bytes
//! are added to the root store right after the default roots.
//!
//! The host routes root-store population through a [`TrustSlot`]. cert-tweaks
//! installs a decorator into that slot on the first configuration load and
//! puts the original establisher back on deactivation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cert_tweaks::{client_config, CertTweaks, Config, TrustSlot};
//!
//! # fn main() -> cert_tweaks::Result<()> {
//! let slot = Arc::new(TrustSlot::default());
//! let tweaks = Arc::new(CertTweaks::new(slot.clone()));
//!
//! tweaks.activate(&Config::from_file("cert-tweaks.toml")?);
//! tweaks.watch("cert-tweaks.toml")?;
//!
//! // Every new client context now trusts the extra certificates.
//! let tls = client_config(&slot);
//! # let _ = tls;
//! tweaks.deactivate();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extension;
pub mod loader;
pub mod notification;
pub mod tls;
pub mod trust;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};
pub use extension::CertTweaks;
pub use loader::{CertificateLoader, LoadReport};
pub use notification::{MemoryNotifier, Notification, Notifier, TracingNotifier};
pub use tls::{client_config, probe, ProbeReport};
pub use trust::{
    CertificateBlob, CertificateSource, DefaultRoots, EstablishTrust, TrustAugmenter, TrustList,
    TrustSlot, TrustSummary,
};
pub use watch::ConfigWatcher;
