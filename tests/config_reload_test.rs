//! Config live-reload integration tests.
//!
//! `CertTweaks::watch` subscribes to the configuration file; rewriting the
//! file rebuilds the trust list without reinstalling the decorator.

mod common;

use cert_tweaks::{client_config, probe, Config};
use common::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or the deadline passes.
async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

#[tokio::test]
async fn test_file_change_reloads_trust_list() {
    let t = test_report!("Rewriting the config file adds the CA");
    let ca = TestCa::generate();
    let addr = start_tls_server(ca.server_tls_config("localhost")).await;
    let config_path = ca.write_config("cert-tweaks.toml", &[], false);

    let (slot, notifier, tweaks) = tweaks_with_env(extra_ca_env(None));
    let tweaks = Arc::new(tweaks);
    tweaks.activate(&Config::from_file(&config_path).unwrap());
    tweaks.watch(&config_path).unwrap();
    let wrapper = slot.current();

    let before = probe(&addr.to_string(), "localhost", client_config(&slot)).await;
    t.assert_true("rejected before change", before.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    t.action("Rewrite config with the CA listed");
    std::fs::write(&config_path, config_toml(&[ca.cert_path.as_path()], false)).unwrap();

    let reloaded = wait_for(|| tweaks.trust_list().len() == 1).await;
    t.assert_true("trust list reloaded", reloaded);
    t.assert_true("decorator not reinstalled", Arc::ptr_eq(&slot.current(), &wrapper));

    let after = probe(&addr.to_string(), "localhost", client_config(&slot)).await;
    t.assert_true("trusted after change", after.is_ok());
    t.assert_true("no notifications", notifier.is_empty());

    tweaks.deactivate();
}

#[tokio::test]
async fn test_invalid_rewrite_keeps_previous_list() {
    let t = test_report!("A broken config file keeps the previous certificates");
    let ca = TestCa::generate();
    let config_path = ca.write_config("cert-tweaks.toml", &[ca.cert_path.as_path()], false);

    let (_slot, notifier, tweaks) = tweaks_with_env(extra_ca_env(None));
    let tweaks = Arc::new(tweaks);
    tweaks.activate(&Config::from_file(&config_path).unwrap());
    tweaks.watch(&config_path).unwrap();
    t.assert_eq("one cert", &tweaks.trust_list().len(), &1usize);

    tokio::time::sleep(Duration::from_millis(100)).await;
    t.action("Rewrite config with invalid TOML");
    std::fs::write(&config_path, "[certs\nextraCerts = [").unwrap();

    let reported = wait_for(|| !notifier.is_empty()).await;
    t.assert_true("failure reported", reported);
    t.assert_eq("list kept", &tweaks.trust_list().len(), &1usize);

    tweaks.deactivate();
}

#[tokio::test]
async fn test_no_reload_after_deactivate() {
    let t = test_report!("Changes after deactivate are ignored");
    let ca = TestCa::generate();
    let config_path = ca.write_config("cert-tweaks.toml", &[], false);

    let (_slot, _notifier, tweaks) = tweaks_with_env(extra_ca_env(None));
    let tweaks = Arc::new(tweaks);
    tweaks.activate(&Config::from_file(&config_path).unwrap());
    tweaks.watch(&config_path).unwrap();
    tweaks.deactivate();

    std::fs::write(&config_path, config_toml(&[ca.cert_path.as_path()], false)).unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;

    t.assert_true("list still empty", tweaks.trust_list().is_empty());
    t.assert_true("not installed", !tweaks.is_installed());
}
