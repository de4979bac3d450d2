//! TLS certificate introspection
//!
//! The HTTP executor opens a second, independent TLS connection to an
//! `https://` target to read the peer certificate. Trust is never evaluated
//! on that connection, only the certificate contents are collected.
//!
//! # Module Organization
//!
//! - `metadata` - Certificate parsing into [`TlsInfo`](crate::TlsInfo)
//! - `probe` - TLS handshake and peer certificate extraction

pub mod metadata;
pub mod probe;

pub use metadata::cert_info;
pub use probe::{inspect_certificate, insecure_client_config, server_name_from_host};
