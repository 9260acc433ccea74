//! Test infrastructure: a generated CA, TLS servers signed by it, and
//! config-file helpers.

#![allow(dead_code)]

use cert_tweaks::loader::EnvLookup;
use cert_tweaks::{CertTweaks, MemoryNotifier, TrustSlot};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub use cert_tweaks_test_support::test_report;

// ---------------------------------------------------------------------------
// TestCa
// ---------------------------------------------------------------------------

/// A private CA whose certificate is written to a tempdir.
pub struct TestCa {
    cert: Certificate,
    key: KeyPair,
    pub cert_pem: String,
    pub cert_path: PathBuf,
    pub dir: TempDir,
}

impl TestCa {
    pub fn generate() -> Self {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, "cert-tweaks Test CA");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        let cert_pem = cert.pem();

        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("ca.pem");
        std::fs::write(&cert_path, &cert_pem).unwrap();

        Self {
            cert,
            key,
            cert_pem,
            cert_path,
            dir,
        }
    }

    /// Server config for `hostname`, with a leaf certificate signed by this CA.
    pub fn server_tls_config(&self, hostname: &str) -> Arc<ServerConfig> {
        let leaf_key = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec![hostname.to_string()]).unwrap();
        let leaf = params.signed_by(&leaf_key, &self.cert, &self.key).unwrap();

        let chain = vec![leaf.der().clone(), self.cert.der().clone()];
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der()));
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .unwrap();
        Arc::new(config)
    }

    /// Write a config file listing `extra_certs` and return its path.
    pub fn write_config(&self, name: &str, extra_certs: &[&Path], emulate: bool) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, config_toml(extra_certs, emulate)).unwrap();
        path
    }
}

/// Render a config file body.
pub fn config_toml(extra_certs: &[&Path], emulate: bool) -> String {
    let list = extra_certs
        .iter()
        .map(|p| format!("{:?}", p.display().to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "[certs]\nextraCerts = [{}]\nemulateExtraCACerts = {}\n",
        list, emulate
    )
}

// ---------------------------------------------------------------------------
// TestTlsServer
// ---------------------------------------------------------------------------

/// Accepts TLS connections on 127.0.0.1 until the runtime shuts down.
pub async fn start_tls_server(config: Arc<ServerConfig>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TlsAcceptor::from(config);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(mut tls) = acceptor.accept(stream).await {
                    let _ = tls.shutdown().await;
                }
            });
        }
    });

    addr
}

// ---------------------------------------------------------------------------
// CertTweaks helpers
// ---------------------------------------------------------------------------

/// Environment lookup that only knows `NODE_EXTRA_CA_CERTS`.
pub fn extra_ca_env(value: Option<&Path>) -> EnvLookup {
    let value: Option<OsString> = value.map(|p| p.as_os_str().to_owned());
    Arc::new(move |name: &str| {
        if name == cert_tweaks::config::EXTRA_CA_CERTS_ENV {
            value.clone()
        } else {
            None
        }
    })
}

/// A CertTweaks over the default roots, recording notifications.
pub fn tweaks_with_env(env: EnvLookup) -> (Arc<TrustSlot>, Arc<MemoryNotifier>, CertTweaks) {
    let slot = Arc::new(TrustSlot::default());
    let notifier = Arc::new(MemoryNotifier::new());
    let tweaks = CertTweaks::with_notifier(slot.clone(), notifier.clone()).with_env(env);
    (slot, notifier, tweaks)
}
