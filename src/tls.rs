//! TLS client contexts built through the trust slot

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::trust::TrustSlot;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client config whose roots come from the slot's current
/// establisher. Call this for every new context so reloads are picked up.
pub fn client_config(slot: &TrustSlot) -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    let summary = slot.establish_trust(&mut roots);
    tracing::debug!(
        roots = roots.len(),
        added = summary.added,
        ignored = summary.ignored,
        "Root store populated"
    );

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Arc::new(config)
}

/// What a successful handshake negotiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub protocol: Option<String>,
    pub peer_certificates: usize,
}

/// Connect to `addr` and complete a TLS handshake for `server_name`.
pub async fn probe(addr: &str, server_name: &str, config: Arc<ClientConfig>) -> Result<ProbeReport> {
    let name = ServerName::try_from(server_name.to_string())
        .map_err(|e| Error::tls(format!("Invalid server name '{}': {}", server_name, e)))?;

    let handshake = async {
        let tcp = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::tls(format!("Failed to connect to {}: {}", addr, e)))?;

        let stream = TlsConnector::from(config)
            .connect(name, tcp)
            .await
            .map_err(|e| Error::tls(format!("Handshake with {} failed: {}", addr, e)))?;

        let (_, conn) = stream.get_ref();
        Ok::<_, Error>(ProbeReport {
            protocol: conn.protocol_version().map(|v| format!("{:?}", v)),
            peer_certificates: conn.peer_certificates().map_or(0, |c| c.len()),
        })
    };

    tokio::time::timeout(PROBE_TIMEOUT, handshake)
        .await
        .map_err(|_| Error::tls(format!("Timed out probing {}", addr)))?
}
