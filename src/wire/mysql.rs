//! `MySQL` client/server protocol, initial handshake only

use anyhow::{Context, Result, bail};

pub const CLIENT_SSL: u32 = 0x0000_0800;
pub const HEADER_LEN: usize = 4;
/// Greeting packets are small, anything bigger is not a `MySQL` server
pub const MAX_GREETING_LEN: usize = 64 * 1024;

const ERR_PACKET: u8 = 0xFF;

/// Server greeting (`HandshakeV10`) fields of interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub capabilities: u32,
}

/// Payload length from a 4-byte packet header (3 bytes little endian + sequence id)
#[must_use]
pub fn payload_len(header: [u8; HEADER_LEN]) -> usize {
    let [b0, b1, b2, _seq] = header;
    usize::from(b0) | (usize::from(b1) << 8) | (usize::from(b2) << 16)
}

/// Decode the first packet a server sends.
///
/// # Errors
///
/// Returns an error carrying the server message for an ERR packet (e.g. host
/// blocked, too many connections) and for payloads that are not a greeting.
pub fn parse_greeting(payload: &[u8]) -> Result<Greeting> {
    let Some((&protocol_version, rest)) = payload.split_first() else {
        bail!("empty MySQL handshake payload");
    };

    if protocol_version == ERR_PACKET {
        bail!("server refused connection: {}", parse_error(rest));
    }

    let version_end = rest
        .iter()
        .position(|&b| b == 0)
        .context("invalid MySQL handshake: missing version terminator")?;
    let server_version = String::from_utf8_lossy(rest.get(..version_end).unwrap_or_default())
        .into_owned();
    let mut cursor = 1 + version_end + 1;

    if payload.len() < cursor + 4 + 8 + 1 + 2 {
        bail!("unexpectedly short MySQL handshake");
    }
    cursor += 4; // connection id
    cursor += 8; // auth plugin data part 1
    cursor += 1; // filler

    let mut capabilities = payload
        .get(cursor..cursor + 2)
        .and_then(|b| b.try_into().ok())
        .map(|b| u32::from(u16::from_le_bytes(b)))
        .context("invalid MySQL handshake: missing lower capabilities")?;
    cursor += 2;

    cursor += 1; // character set
    cursor += 2; // status flags
    if let Some(upper) = payload
        .get(cursor..cursor + 2)
        .and_then(|b| b.try_into().ok())
        .map(|b| u32::from(u16::from_le_bytes(b)))
    {
        capabilities |= upper << 16;
    }

    Ok(Greeting {
        protocol_version,
        server_version,
        capabilities,
    })
}

/// `ERR_Packet` body after the 0xFF marker: code, optional `#SQLSTATE`, message
fn parse_error(body: &[u8]) -> String {
    let code = body
        .get(..2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes);
    let mut message = body.get(2..).unwrap_or_default();
    if message.first() == Some(&b'#') {
        message = message.get(6..).unwrap_or_default();
    }
    let message = String::from_utf8_lossy(message);

    match code {
        Some(code) => format!("{code} {message}"),
        None => message.into_owned(),
    }
}
