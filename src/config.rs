use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// Monitor type identifier used to pick an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorType {
    Http,
    Tcp,
    Ping,
    Dns,
    Redis,
    Mysql,
    Postgresql,
    Sqlserver,
    Mongodb,
    Docker,
}

impl MonitorType {
    pub const ALL: [Self; 10] = [
        Self::Http,
        Self::Tcp,
        Self::Ping,
        Self::Dns,
        Self::Redis,
        Self::Mysql,
        Self::Postgresql,
        Self::Sqlserver,
        Self::Mongodb,
        Self::Docker,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Tcp => "TCP",
            Self::Ping => "PING",
            Self::Dns => "DNS",
            Self::Redis => "REDIS",
            Self::Mysql => "MYSQL",
            Self::Postgresql => "POSTGRESQL",
            Self::Sqlserver => "SQLSERVER",
            Self::Mongodb => "MONGODB",
            Self::Docker => "DOCKER",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid monitor type: {s}"))
    }
}

/// Protocol specific monitor configuration, tagged by monitor type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MonitorConfig {
    Http(HttpConfig),
    Tcp(TcpConfig),
    Ping(PingConfig),
    Dns(DnsConfig),
    Redis(RedisConfig),
    Mysql(MysqlConfig),
    Postgresql(PostgresConfig),
    Sqlserver(SqlServerConfig),
    Mongodb(MongoConfig),
    Docker(DockerConfig),
}

impl MonitorConfig {
    #[must_use]
    pub const fn monitor_type(&self) -> MonitorType {
        match self {
            Self::Http(_) => MonitorType::Http,
            Self::Tcp(_) => MonitorType::Tcp,
            Self::Ping(_) => MonitorType::Ping,
            Self::Dns(_) => MonitorType::Dns,
            Self::Redis(_) => MonitorType::Redis,
            Self::Mysql(_) => MonitorType::Mysql,
            Self::Postgresql(_) => MonitorType::Postgresql,
            Self::Sqlserver(_) => MonitorType::Sqlserver,
            Self::Mongodb(_) => MonitorType::Mongodb,
            Self::Docker(_) => MonitorType::Docker,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    /// Ignored for GET and HEAD
    pub body: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    /// Comma separated codes and ranges, e.g. `200-299,302`
    pub expected_status: String,
    pub keyword: Option<String>,
    pub invert_keyword: bool,
    pub follow_redirects: bool,
    pub ignore_tls: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            basic_auth: None,
            expected_status: "200-299".to_string(),
            keyword: None,
            invert_keyword: false,
            follow_redirects: true,
            ignore_tls: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TcpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PingConfig {
    pub hostname: String,
    pub packet_size: Option<u16>,
}

/// DNS record types a DNS monitor can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    #[default]
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
    Srv,
    Ptr,
    Soa,
    Caa,
}

impl DnsRecordType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Txt => "TXT",
            Self::Srv => "SRV",
            Self::Ptr => "PTR",
            Self::Soa => "SOA",
            Self::Caa => "CAA",
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DnsConfig {
    pub hostname: String,
    pub record_type: DnsRecordType,
    /// `ip` or `ip:port` of the resolver to ask
    pub resolver: String,
    pub expected_value: Option<String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            record_type: DnsRecordType::A,
            resolver: "1.1.1.1".to_string(),
            expected_value: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedisConfig {
    /// `redis://[user:pass@]host[:port][/db]`, takes precedence over the fields below
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<u32>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MysqlConfig {
    /// `mysql://<username>:<password>@tcp(<host>:<port>)/<database>`
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 3306,
            username: None,
            password: None,
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostgresConfig {
    /// `postgres://<username>@tcp(<host>:<port>)/<database>`
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub database: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqlServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SqlServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MongoConfig {
    pub connection_string: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            connection_string: "mongodb://localhost:27017".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DockerConfig {
    /// Docker Engine API base URL, e.g. `http://localhost:2375`
    pub base_url: String,
    pub container_id: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2375".to_string(),
            container_id: String::new(),
        }
    }
}
