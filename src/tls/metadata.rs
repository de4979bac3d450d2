use crate::result::TlsInfo;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::{
    prelude::{FromDer, X509Certificate},
    time::ASN1Time,
};

/// Extract subject, issuer, validity window and fingerprint from a DER-encoded certificate
///
/// # Errors
///
/// Returns an error if the certificate cannot be parsed
pub fn cert_info(cert_der: &[u8], now: DateTime<Utc>) -> Result<TlsInfo> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| anyhow!("failed to parse certificate: {e}"))?;

    let validity = cert.validity();
    let valid_from = to_utc(&validity.not_before)?;
    let valid_to = to_utc(&validity.not_after)?;

    Ok(TlsInfo {
        issuer: cert.issuer().to_string(),
        subject: cert.subject().to_string(),
        valid_from,
        valid_to,
        days_until_expiry: (valid_to - now).num_days(),
        fingerprint: fingerprint(cert_der),
    })
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    let raw = time.to_datetime();
    DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
        .ok_or_else(|| anyhow!("invalid certificate timestamp"))
}

/// SHA-256 fingerprint as colon separated upper-case hex pairs
#[must_use]
pub fn fingerprint(cert_der: &[u8]) -> String {
    Sha256::digest(cert_der)
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::tls::test_support::LOCALHOST_CERT;
    use chrono::TimeZone;

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(b"not really a certificate");
        let pairs: Vec<&str> = fp.split(':').collect();
        assert_eq!(pairs.len(), 32);
        assert!(
            pairs
                .iter()
                .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
        );
        assert_eq!(fp, fp.to_uppercase());
    }

    #[test]
    fn test_fingerprint_known_digest() {
        // sha256("") = e3b0c442...
        assert!(fingerprint(b"").starts_with("E3:B0:C4:42"));
    }

    #[test]
    fn test_cert_info_rejects_garbage() {
        let result = cert_info(&[0x30, 0x03, 0x01, 0x02], Utc::now());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("failed to parse certificate")
        );
    }

    #[test]
    fn test_cert_info_self_signed() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let info = cert_info(LOCALHOST_CERT, now).unwrap();

        assert_eq!(info.subject, "CN=localhost, O=probepulse test");
        assert_eq!(info.issuer, "CN=localhost, O=probepulse test");
        assert_eq!(
            info.valid_from,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            info.valid_to,
            Utc.with_ymd_and_hms(2125, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(info.days_until_expiry, 36_159);
        assert_eq!(
            info.fingerprint,
            "D8:A5:3B:A0:1E:D2:47:2B:DD:FE:23:92:E2:11:20:5D:\
             22:54:49:24:96:09:6E:9D:D7:A8:62:1B:4D:36:55:74"
        );
    }

    #[test]
    fn test_days_until_expiry_goes_negative() {
        let now = Utc.with_ymd_and_hms(2126, 1, 1, 0, 0, 0).unwrap();
        let info = cert_info(LOCALHOST_CERT, now).unwrap();
        assert_eq!(info.days_until_expiry, -365);
    }
}
