mod common;

use common::*;
use probepulse::{ExecutorRegistry, Status};
use serde_json::json;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
#[ignore = "requires internet access"]
async fn test_ignore_tls_does_not_leak_between_concurrent_probes() {
    if skip_if_no_network() {
        return;
    }

    let registry = ExecutorRegistry::new().unwrap();
    let insecure = config(json!({
        "type": "HTTP",
        "url": "https://self-signed.badssl.com/",
        "ignoreTls": true,
    }));
    let strict = config(json!({
        "type": "HTTP",
        "url": "https://self-signed.badssl.com/",
    }));
    let valid = config(json!({"type": "HTTP", "url": "https://example.com/"}));

    for _ in 0..3 {
        let (insecure, strict, valid) = tokio::join!(
            registry.execute("HTTP", &insecure, TIMEOUT),
            registry.execute("HTTP", &strict, TIMEOUT),
            registry.execute("HTTP", &valid, TIMEOUT),
        );
        let (insecure, strict, valid) = (insecure.unwrap(), strict.unwrap(), valid.unwrap());

        assert_up(&insecure);
        assert_eq!(
            strict.status,
            Status::Down,
            "verification was skipped for a probe that did not opt out"
        );
        assert_up(&valid);
        assert!(insecure.tls_info.is_some());
    }
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn test_https_reports_certificate() {
    if skip_if_no_network() {
        return;
    }

    let result = probe(
        "HTTP",
        json!({"type": "HTTP", "url": "https://example.com/"}),
        TIMEOUT,
    )
    .await;
    assert_up(&result);
    let tls = result.tls_info.expect("certificate details");
    assert!(tls.days_until_expiry > 0);
    assert_eq!(tls.fingerprint.split(':').count(), 32);
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn test_dns_mx_records() {
    if skip_if_no_network() {
        return;
    }

    let result = probe(
        "DNS",
        json!({
            "type": "DNS",
            "hostname": "gmail.com",
            "recordType": "MX",
            "expectedValue": "GOOGLE.COM"
        }),
        TIMEOUT,
    )
    .await;
    assert_up(&result);
    let dns = result.dns_result.expect("dns result");
    assert_eq!(dns.record_type, "MX");
    assert!(dns.records.iter().all(|r| r.split(' ').count() == 2));
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn test_dns_missing_record_is_down() {
    if skip_if_no_network() {
        return;
    }

    let result = probe(
        "DNS",
        json!({
            "type": "DNS",
            "hostname": "does-not-exist.example.com",
            "recordType": "A",
            "resolver": "8.8.8.8"
        }),
        TIMEOUT,
    )
    .await;
    assert_eq!(result.status, Status::Down);
    assert!(result.dns_result.unwrap().records.is_empty());
}

#[tokio::test]
#[ignore = "requires the ping binary"]
async fn test_ping_localhost() {
    let result = probe(
        "PING",
        json!({"type": "PING", "hostname": "127.0.0.1"}),
        Duration::from_secs(5),
    )
    .await;
    assert_up(&result);
    // the TCP fallback cannot measure loss
    if result.message.ends_with("(tcp)") {
        assert!(result.packet_loss.is_none());
    } else {
        assert_eq!(result.packet_loss, Some(0.0));
    }
}
