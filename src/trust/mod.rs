//! Extra trust anchors and the decorator that installs them

mod augmenter;
mod establish;
mod list;

pub use augmenter::{AugmentedTrust, TrustAugmenter};
pub use establish::{
    add_ca_cert, DefaultRoots, EstablishTrust, SharedEstablisher, TrustSlot, TrustSummary,
};
pub use list::{CertificateBlob, CertificateSource, TrustList};
