//! cert-tweaks CLI - inspect and try out extra root certificates

use clap::{Parser, Subcommand};
use rustls::RootCertStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cert_tweaks::trust::add_ca_cert;
use cert_tweaks::{
    client_config, probe, CertTweaks, CertificateLoader, Config, TracingNotifier, TrustSlot,
};

#[derive(Parser)]
#[command(name = "cert-tweaks")]
#[command(about = "Trust extra root certificate authorities for TLS clients")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every configured certificate file and report the outcome
    Check {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Handshake with a TLS server using the default plus extra roots
    Probe {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Address to connect to (host:port)
        addr: String,

        /// Name to verify the server certificate against (defaults to the host of `addr`)
        #[arg(long)]
        server_name: Option<String>,
    },
}

fn host_of(addr: &str) -> &str {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    host.trim_start_matches('[').trim_end_matches(']')
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { config } => {
            println!("Checking configuration: {}", config.display());

            let cfg = Config::from_file(&config)?;
            let loader = CertificateLoader::new(Arc::new(TracingNotifier));
            let sources = loader.sources(&cfg.certs);

            println!();
            println!("  emulateExtraCACerts: {}", cfg.certs.emulate_extra_ca_certs);
            println!("  Sources: {}", sources.len());

            let report = loader.load(&cfg.certs);
            let mut store = RootCertStore::empty();
            let mut rejected = 0;
            for blob in &report.blobs {
                let summary = add_ca_cert(&mut store, blob.data());
                rejected += summary.ignored;
                println!(
                    "  ok    {} ({} bytes, {} certificates)",
                    blob.source(),
                    blob.len(),
                    summary.added
                );
            }
            for failure in &report.failures {
                println!("  fail  {}", failure);
            }

            println!();
            println!(
                "Loaded {} of {} certificate files.",
                report.blobs.len(),
                sources.len()
            );
            println!(
                "Trust anchors: {} accepted, {} rejected.",
                store.len(),
                rejected
            );

            if !report.failures.is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Probe {
            config,
            addr,
            server_name,
        } => {
            let cfg = Config::from_file(&config)?;
            let server_name = server_name.unwrap_or_else(|| host_of(&addr).to_string());

            let slot = Arc::new(TrustSlot::default());
            let tweaks = CertTweaks::new(slot.clone());
            let loaded = tweaks.activate(&cfg);
            tracing::info!(certificates = loaded.blobs.len(), "Extra certificates active");

            let result = probe(&addr, &server_name, client_config(&slot)).await;
            tweaks.deactivate();

            match result {
                Ok(report) => {
                    println!("Handshake with {} ({}) succeeded", addr, server_name);
                    println!(
                        "  Protocol: {}",
                        report.protocol.as_deref().unwrap_or("unknown")
                    );
                    println!("  Peer certificates: {}", report.peer_certificates);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
