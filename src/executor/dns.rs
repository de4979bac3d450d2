use super::{Executor, Outcome, invalid_config, run_probe};
use crate::{
    config::{DnsConfig, DnsRecordType, MonitorConfig, MonitorType},
    result::{DnsResult, ExecutorResult, Status},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use hickory_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    proto::rr::{Name, RData, RecordType},
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

const DEFAULT_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
const DNS_PORT: u16 = 53;

/// Resolves one record type against the configured resolver only, never the
/// system one. A fresh resolver is built per probe so nothing is cached.
#[derive(Debug, Default)]
pub struct DnsExecutor;

#[derive(Debug)]
struct Resolution {
    status: Status,
    message: String,
    result: DnsResult,
}

impl Outcome for Resolution {
    fn into_result(self, latency: Duration) -> ExecutorResult {
        ExecutorResult::new(self.status, latency, self.message).with_dns_result(self.result)
    }
}

#[async_trait]
impl Executor for DnsExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Dns
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Dns(dns) = config else {
            return invalid_config(MonitorType::Dns, config);
        };
        run_probe(MonitorType::Dns, timeout, resolve(dns, timeout)).await
    }
}

async fn resolve(config: &DnsConfig, timeout: Duration) -> Result<Resolution> {
    let hostname = config.hostname.trim();
    if hostname.is_empty() {
        bail!("No hostname configured");
    }
    let server = resolver_addr(&config.resolver)?;

    let resolver = TokioAsyncResolver::tokio(
        ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[server.ip()], server.port(), true),
        ),
        resolver_opts(timeout),
    );

    let record_type = record_type(config.record_type);
    let records = match resolver.lookup(hostname, record_type).await {
        Ok(lookup) => lookup
            .record_iter()
            .filter(|record| record.record_type() == record_type)
            .filter_map(|record| record.data())
            .map(format_record)
            .collect(),
        Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Vec::new(),
        Err(e) => {
            return Err(e).with_context(|| {
                format!("{} lookup for {hostname} via {server} failed", config.record_type)
            });
        }
    };

    Ok(evaluate(
        hostname,
        config.record_type,
        records,
        config.expected_value.as_deref(),
    ))
}

// ResolverOpts is non_exhaustive
#[allow(clippy::field_reassign_with_default)]
fn resolver_opts(timeout: Duration) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.attempts = 1;
    opts.timeout = timeout;
    opts.cache_size = 0;
    opts
}

/// `ip` or `ip:port`, IPv6 may be bracketed; empty means `1.1.1.1`
fn resolver_addr(resolver: &str) -> Result<SocketAddr> {
    let resolver = resolver.trim();
    if resolver.is_empty() {
        return Ok(SocketAddr::new(DEFAULT_RESOLVER, DNS_PORT));
    }
    if let Ok(addr) = resolver.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let ip: IpAddr = resolver
        .trim_matches(['[', ']'])
        .parse()
        .with_context(|| format!("Invalid resolver address: {resolver}"))?;
    Ok(SocketAddr::new(ip, DNS_PORT))
}

const fn record_type(record_type: DnsRecordType) -> RecordType {
    match record_type {
        DnsRecordType::A => RecordType::A,
        DnsRecordType::Aaaa => RecordType::AAAA,
        DnsRecordType::Cname => RecordType::CNAME,
        DnsRecordType::Mx => RecordType::MX,
        DnsRecordType::Ns => RecordType::NS,
        DnsRecordType::Txt => RecordType::TXT,
        DnsRecordType::Srv => RecordType::SRV,
        DnsRecordType::Ptr => RecordType::PTR,
        DnsRecordType::Soa => RecordType::SOA,
        DnsRecordType::Caa => RecordType::CAA,
    }
}

fn name(name: &Name) -> String {
    name.to_utf8().trim_end_matches('.').to_string()
}

fn format_record(data: &RData) -> String {
    match data {
        RData::A(a) => a.to_string(),
        RData::AAAA(aaaa) => aaaa.to_string(),
        RData::CNAME(cname) => name(&cname.0),
        RData::NS(ns) => name(&ns.0),
        RData::PTR(ptr) => name(&ptr.0),
        RData::MX(mx) => format!("{} {}", mx.preference(), name(mx.exchange())),
        RData::SRV(srv) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            name(srv.target())
        ),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            name(soa.mname()),
            name(soa.rname()),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk))
            .collect(),
        other => other.to_string(),
    }
}

fn evaluate(
    hostname: &str,
    record_type: DnsRecordType,
    records: Vec<String>,
    expected: Option<&str>,
) -> Resolution {
    let (status, message) = if records.is_empty() {
        (
            Status::Down,
            format!("No {record_type} records found for {hostname}"),
        )
    } else {
        let listed = records.join(", ");
        match expected.map(str::trim).filter(|e| !e.is_empty()) {
            Some(expected) => {
                let needle = expected.to_lowercase();
                if records.iter().any(|r| r.to_lowercase().contains(&needle)) {
                    (
                        Status::Up,
                        format!("{record_type} {hostname} matched \"{expected}\": {listed}"),
                    )
                } else {
                    (
                        Status::Down,
                        format!("{record_type} {hostname} did not match \"{expected}\": {listed}"),
                    )
                }
            }
            None => (
                Status::Up,
                format!("{record_type} {hostname} resolved to {listed}"),
            ),
        }
    };

    Resolution {
        status,
        message,
        result: DnsResult {
            record_type: record_type.to_string(),
            records,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use hickory_resolver::proto::rr::rdata::{MX, SOA, SRV, TXT};
    use std::str::FromStr;

    fn fqdn(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn test_resolver_addr() {
        assert_eq!(
            resolver_addr("").unwrap(),
            "1.1.1.1:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver_addr("8.8.8.8").unwrap(),
            "8.8.8.8:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver_addr("127.0.0.1:5353").unwrap(),
            "127.0.0.1:5353".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver_addr("[2606:4700:4700::1111]").unwrap(),
            "[2606:4700:4700::1111]:53".parse::<SocketAddr>().unwrap()
        );
        assert!(resolver_addr("dns.google").is_err());
    }

    #[test]
    fn test_format_mx_srv_soa_txt() {
        let mx = RData::MX(MX::new(10, fqdn("mail.example.com.")));
        assert_eq!(format_record(&mx), "10 mail.example.com");

        let srv = RData::SRV(SRV::new(0, 5, 5060, fqdn("sip.example.com.")));
        assert_eq!(format_record(&srv), "0 5 5060 sip.example.com");

        let soa = RData::SOA(SOA::new(
            fqdn("ns1.example.com."),
            fqdn("hostmaster.example.com."),
            2_024_010_101,
            7200,
            3600,
            1_209_600,
            300,
        ));
        assert_eq!(
            format_record(&soa),
            "ns1.example.com hostmaster.example.com 2024010101 7200 3600 1209600 300"
        );

        let txt = RData::TXT(TXT::new(vec![
            "v=spf1 ".to_string(),
            "include:_spf.example.com ~all".to_string(),
        ]));
        assert_eq!(
            format_record(&txt),
            "v=spf1 include:_spf.example.com ~all"
        );

        let a = RData::A(Ipv4Addr::new(93, 184, 216, 34).into());
        assert_eq!(format_record(&a), "93.184.216.34");
    }

    #[test]
    fn test_two_mx_records() {
        let records = vec![
            format_record(&RData::MX(MX::new(10, fqdn("mx1.example.com.")))),
            format_record(&RData::MX(MX::new(20, fqdn("mx2.example.com.")))),
        ];
        let resolution = evaluate("example.com", DnsRecordType::Mx, records, None);
        assert_eq!(resolution.status, Status::Up);
        assert_eq!(
            resolution.result.records,
            vec!["10 mx1.example.com", "20 mx2.example.com"]
        );
        assert_eq!(resolution.result.record_type, "MX");
    }

    #[test]
    fn test_no_records_is_down_even_with_expected_value() {
        let resolution = evaluate("nothing.example.com", DnsRecordType::Txt, vec![], Some("x"));
        assert_eq!(resolution.status, Status::Down);
        assert_eq!(
            resolution.message,
            "No TXT records found for nothing.example.com"
        );
        assert!(resolution.result.records.is_empty());
    }

    #[test]
    fn test_expected_value_is_case_insensitive() {
        let records = vec!["10 MX1.Example.com".to_string()];
        let resolution = evaluate(
            "example.com",
            DnsRecordType::Mx,
            records.clone(),
            Some("mx1.example"),
        );
        assert_eq!(resolution.status, Status::Up);

        let resolution = evaluate("example.com", DnsRecordType::Mx, records, Some("mx9"));
        assert_eq!(resolution.status, Status::Down);
        assert_eq!(
            resolution.message,
            "MX example.com did not match \"mx9\": 10 MX1.Example.com"
        );
    }

    #[test]
    fn test_result_carries_dns_payload() {
        let resolution = evaluate(
            "example.com",
            DnsRecordType::A,
            vec!["93.184.216.34".to_string()],
            None,
        );
        let result = resolution.into_result(Duration::from_millis(12));
        assert!(result.is_up());
        assert_eq!(result.latency_ms, 12);
        assert_eq!(result.dns_result.unwrap().records, vec!["93.184.216.34"]);
    }

    #[tokio::test]
    async fn test_empty_hostname_is_down() {
        let config = MonitorConfig::Dns(DnsConfig::default());
        let result = DnsExecutor.execute(&config, Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Down);
        assert_eq!(result.message, "No hostname configured");
        assert!(result.dns_result.is_none());
    }
}
