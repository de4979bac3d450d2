use super::{Executor, invalid_config, run_probe};
use crate::{
    config::{HttpConfig, MonitorConfig, MonitorType},
    result::{ExecutorResult, Status, TlsInfo},
    tls::inspect_certificate,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client, Method, Url,
    header::{HeaderMap, HeaderName, HeaderValue},
    redirect::Policy,
};
use std::{collections::HashMap, ops::RangeInclusive, time::Duration};
use tracing::debug;

const MAX_REDIRECTS: usize = 10;
const TLS_INSPECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_STATUS: RangeInclusive<u16> = 200..=299;

/// HTTP(S) checks with status, keyword and certificate inspection.
///
/// Certificate verification is a property of the transport, so one client is
/// built per (redirect policy, verification) pair up front and each request
/// picks the one it asked for. Opting out of verification never touches the
/// transports used by other probes.
#[derive(Debug)]
pub struct HttpExecutor {
    follow_verified: Client,
    follow_insecure: Client,
    manual_verified: Client,
    manual_insecure: Client,
}

impl HttpExecutor {
    /// # Errors
    ///
    /// Returns an error if a TLS backend cannot be initialised
    pub fn new() -> Result<Self> {
        Ok(Self {
            follow_verified: build_client(true, false)?,
            follow_insecure: build_client(true, true)?,
            manual_verified: build_client(false, false)?,
            manual_insecure: build_client(false, true)?,
        })
    }

    const fn client(&self, follow_redirects: bool, ignore_tls: bool) -> &Client {
        match (follow_redirects, ignore_tls) {
            (true, false) => &self.follow_verified,
            (true, true) => &self.follow_insecure,
            (false, false) => &self.manual_verified,
            (false, true) => &self.manual_insecure,
        }
    }

    async fn request(&self, config: &HttpConfig) -> Result<(Status, String)> {
        let method = Method::from_bytes(config.method.trim().to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", config.method))?;
        let headers = header_map(&config.headers)?;

        let mut request = self
            .client(config.follow_redirects, config.ignore_tls)
            .request(method.clone(), &config.url)
            .headers(headers);
        if let Some(auth) = &config.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        if let Some(body) = &config.body
            && method != Method::GET
            && method != Method::HEAD
        {
            request = request.body(body.clone());
        }

        let response = request.send().await.context("Request failed")?;
        let code = response.status();
        let status_line = match code.canonical_reason() {
            Some(reason) => format!("HTTP {} {reason}", code.as_u16()),
            None => format!("HTTP {}", code.as_u16()),
        };

        if !status_matches(&parse_status_ranges(&config.expected_status), code.as_u16()) {
            let expected = if config.expected_status.trim().is_empty() {
                "200-299"
            } else {
                config.expected_status.as_str()
            };
            return Ok((
                Status::Down,
                format!("{status_line}, expected status {expected}"),
            ));
        }

        let Some(keyword) = config.keyword.as_deref().filter(|k| !k.is_empty()) else {
            return Ok((Status::Up, status_line));
        };

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(keyword_check(&body, keyword, config.invert_keyword, &status_line))
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Http
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Http(http) = config else {
            return invalid_config(MonitorType::Http, config);
        };

        // the certificate is fetched over its own connection, in parallel,
        // so a slow handshake does not show up in the request latency
        let (result, tls_info) = tokio::join!(
            run_probe(MonitorType::Http, timeout, self.request(http)),
            introspect(tls_target(&http.url), timeout),
        );
        result.with_tls_info(tls_info)
    }
}

fn build_client(follow_redirects: bool, insecure: bool) -> Result<Client> {
    let redirect = if follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .use_rustls_tls()
        .redirect(redirect)
        .danger_accept_invalid_certs(insecure)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid header name: {name}"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {name}"))?;
        map.insert(header, value);
    }
    Ok(map)
}

/// Parse `"200-299,302"` style lists. Malformed parts are skipped, and an
/// input without any valid part means `200-299`.
pub(crate) fn parse_status_ranges(expected: &str) -> Vec<RangeInclusive<u16>> {
    let ranges: Vec<_> = expected
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            match part.split_once('-') {
                Some((low, high)) => {
                    let low: u16 = low.trim().parse().ok()?;
                    let high: u16 = high.trim().parse().ok()?;
                    (low <= high).then_some(low..=high)
                }
                None => part.parse().ok().map(|code| code..=code),
            }
        })
        .collect();

    if ranges.is_empty() {
        vec![DEFAULT_STATUS]
    } else {
        ranges
    }
}

pub(crate) fn status_matches(ranges: &[RangeInclusive<u16>], code: u16) -> bool {
    ranges.iter().any(|range| range.contains(&code))
}

fn keyword_check(body: &str, keyword: &str, invert: bool, status_line: &str) -> (Status, String) {
    match (body.contains(keyword), invert) {
        (true, false) => (
            Status::Up,
            format!("{status_line}, keyword \"{keyword}\" found"),
        ),
        (false, false) => (
            Status::Down,
            format!("{status_line}, keyword \"{keyword}\" not found"),
        ),
        (true, true) => (
            Status::Down,
            format!("{status_line}, keyword \"{keyword}\" found but should be absent"),
        ),
        (false, true) => (
            Status::Up,
            format!("{status_line}, keyword \"{keyword}\" absent"),
        ),
    }
}

/// Host and port to inspect, `None` unless the URL is `https`
fn tls_target(url: &str) -> Option<(String, u16)> {
    let url = Url::parse(url).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.trim_matches(['[', ']']).to_string();
    Some((host, url.port_or_known_default()?))
}

async fn introspect(target: Option<(String, u16)>, timeout: Duration) -> Option<TlsInfo> {
    let (host, port) = target?;
    match tokio::time::timeout(
        timeout.min(TLS_INSPECTION_TIMEOUT),
        inspect_certificate(&host, port),
    )
    .await
    {
        Ok(Ok(info)) => info,
        Ok(Err(e)) => {
            debug!(host = %host, port, error = %format!("{e:#}"), "TLS inspection failed");
            None
        }
        Err(_) => {
            debug!(host = %host, port, "TLS inspection timed out");
            None
        }
    }
}
