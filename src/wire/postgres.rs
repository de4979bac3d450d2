//! `PostgreSQL` frontend/backend protocol 3.0, startup phase only

/// Protocol version 3.0 (major 3, minor 0)
pub const PROTOCOL_VERSION: i32 = 196_608;

/// First message a backend can answer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupResponse {
    /// `R`, carries the authentication method code when present
    Authentication(Option<i32>),
    /// `E`, carries the `M` (message) field when present
    Error(Option<String>),
    Unexpected(u8),
}

impl StartupResponse {
    /// Both an authentication request and an error prove a live backend
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Error(_))
    }
}

/// Build a `StartupMessage`: length, protocol version and null terminated
/// `user`/`database` pairs followed by a final null byte.
#[must_use]
pub fn startup_message(user: &str, database: &str) -> Vec<u8> {
    let mut params = Vec::new();
    for (key, value) in [("user", user), ("database", database)] {
        params.extend_from_slice(key.as_bytes());
        params.push(0);
        params.extend_from_slice(value.as_bytes());
        params.push(0);
    }
    params.push(0);

    let len = i32::try_from(4 + 4 + params.len()).unwrap_or(i32::MAX);
    let mut packet = Vec::with_capacity(params.len() + 8);
    packet.extend_from_slice(&len.to_be_bytes());
    packet.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet.extend_from_slice(&params);
    packet
}

/// Classify the first bytes a backend sent back.
///
/// Returns `None` for an empty buffer.
#[must_use]
pub fn parse_startup_response(buf: &[u8]) -> Option<StartupResponse> {
    let (&tag, rest) = buf.split_first()?;
    let body = rest.get(4..).unwrap_or_default();

    let response = match tag {
        b'R' => StartupResponse::Authentication(
            body.get(..4)
                .and_then(|code| code.try_into().ok())
                .map(i32::from_be_bytes),
        ),
        b'E' => StartupResponse::Error(error_message(body)),
        other => StartupResponse::Unexpected(other),
    };
    Some(response)
}

/// Walk `ErrorResponse` fields (`code` byte + cstring) and return the `M` field
fn error_message(mut fields: &[u8]) -> Option<String> {
    while let Some((&code, rest)) = fields.split_first() {
        if code == 0 {
            break;
        }
        let end = rest.iter().position(|&b| b == 0)?;
        let value = rest.get(..end)?;
        if code == b'M' {
            return Some(String::from_utf8_lossy(value).into_owned());
        }
        fields = rest.get(end + 1..)?;
    }
    None
}

/// Human name of an `AuthenticationRequest` code
#[must_use]
pub const fn auth_method(code: i32) -> &'static str {
    match code {
        0 => "none",
        2 => "kerberos",
        3 => "cleartext password",
        5 => "md5 password",
        7 => "gssapi",
        9 => "sspi",
        10 => "sasl",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_startup_message_layout() {
        let msg = startup_message("monitor", "app");
        let expected_body = b"user\0monitor\0database\0app\0\0";

        assert_eq!(msg.len(), 8 + expected_body.len());
        assert_eq!(
            i32::from_be_bytes(msg[..4].try_into().unwrap()),
            i32::try_from(msg.len()).unwrap()
        );
        assert_eq!(&msg[4..8], &[0x00, 0x03, 0x00, 0x00]);
        assert_eq!(&msg[8..], expected_body);
    }

    #[test]
    fn test_parse_authentication_request() {
        // AuthenticationSASL
        let buf = [b'R', 0, 0, 0, 8, 0, 0, 0, 10];
        let response = parse_startup_response(&buf).unwrap();
        assert_eq!(response, StartupResponse::Authentication(Some(10)));
        assert!(response.is_alive());
        assert_eq!(auth_method(10), "sasl");
    }

    #[test]
    fn test_parse_truncated_authentication_request() {
        let response = parse_startup_response(b"R").unwrap();
        assert_eq!(response, StartupResponse::Authentication(None));
        assert!(response.is_alive());
    }

    #[test]
    fn test_parse_error_response() {
        let mut buf = vec![b'E', 0, 0, 0, 0];
        buf.extend_from_slice(b"SFATAL\0C28000\0Mno pg_hba.conf entry for host\0\0");
        let response = parse_startup_response(&buf).unwrap();
        assert_eq!(
            response,
            StartupResponse::Error(Some("no pg_hba.conf entry for host".to_string()))
        );
        assert!(response.is_alive());
    }

    #[test]
    fn test_parse_unexpected_response() {
        let response = parse_startup_response(b"HTTP/1.1 400").unwrap();
        assert_eq!(response, StartupResponse::Unexpected(b'H'));
        assert!(!response.is_alive());
        assert!(parse_startup_response(&[]).is_none());
    }
}
