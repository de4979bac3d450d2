//! TDS Pre-Login exchange (SQL Server)

pub const PACKET_PRELOGIN: u8 = 0x12;
pub const PACKET_TABULAR_RESULT: u8 = 0x04;

const STATUS_EOM: u8 = 0x01;
const HEADER_LEN: usize = 8;

const OPTION_VERSION: u8 = 0x00;
const OPTION_ENCRYPTION: u8 = 0x01;
const OPTION_INSTOPT: u8 = 0x02;
const OPTION_THREADID: u8 = 0x03;
const OPTION_TERMINATOR: u8 = 0xFF;

const ENCRYPT_OFF: u8 = 0x00;

/// Build a Pre-Login packet: 8-byte header, option table
/// (token, offset, length) for VERSION, ENCRYPTION, INSTOPT and THREADID,
/// the 0xFF terminator, then the option payloads.
#[must_use]
pub fn prelogin_packet() -> Vec<u8> {
    let options: [(u8, &[u8]); 4] = [
        // version 0.0.0.0, sub-build 0
        (OPTION_VERSION, &[0, 0, 0, 0, 0, 0]),
        (OPTION_ENCRYPTION, &[ENCRYPT_OFF]),
        // default instance
        (OPTION_INSTOPT, &[0]),
        (OPTION_THREADID, &[0, 0, 0, 0]),
    ];

    let table_len = options.len() * 5 + 1;
    let mut table = Vec::with_capacity(table_len);
    let mut data = Vec::new();
    for (token, value) in options {
        let offset = u16::try_from(table_len + data.len()).unwrap_or(u16::MAX);
        let len = u16::try_from(value.len()).unwrap_or(u16::MAX);
        table.push(token);
        table.extend_from_slice(&offset.to_be_bytes());
        table.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(value);
    }
    table.push(OPTION_TERMINATOR);

    let total = u16::try_from(HEADER_LEN + table.len() + data.len()).unwrap_or(u16::MAX);
    let mut packet = Vec::with_capacity(usize::from(total));
    packet.push(PACKET_PRELOGIN);
    packet.push(STATUS_EOM);
    packet.extend_from_slice(&total.to_be_bytes());
    // SPID
    packet.extend_from_slice(&[0, 0]);
    // packet id, window
    packet.extend_from_slice(&[1, 0]);
    packet.extend_from_slice(&table);
    packet.extend_from_slice(&data);
    packet
}

/// Decode the server VERSION option from a Pre-Login Response as
/// `major.minor.build`. Returns `None` for anything else.
#[must_use]
pub fn parse_prelogin_version(buf: &[u8]) -> Option<String> {
    if *buf.first()? != PACKET_TABULAR_RESULT {
        return None;
    }
    let payload = buf.get(HEADER_LEN..)?;

    let mut cursor = 0;
    loop {
        let token = *payload.get(cursor)?;
        if token == OPTION_TERMINATOR {
            return None;
        }
        let entry = payload.get(cursor + 1..cursor + 5)?;
        if token == OPTION_VERSION {
            let offset = usize::from(u16::from_be_bytes([*entry.first()?, *entry.get(1)?]));
            let version = payload.get(offset..offset + 4)?;
            let build = u16::from_be_bytes([*version.get(2)?, *version.get(3)?]);
            return Some(format!("{}.{}.{build}", version.first()?, version.get(1)?));
        }
        cursor += 5;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_prelogin_header() {
        let packet = prelogin_packet();
        assert_eq!(packet[0], PACKET_PRELOGIN);
        assert_eq!(packet[1], STATUS_EOM);
        let len = u16::from_be_bytes([packet[2], packet[3]]);
        assert_eq!(usize::from(len), packet.len());
        // 8 header + 21 option table + 12 option data
        assert_eq!(packet.len(), 41);
    }

    #[test]
    fn test_prelogin_option_table() {
        let packet = prelogin_packet();
        let payload = &packet[8..];

        let expected = [
            (OPTION_VERSION, 21u16, 6u16),
            (OPTION_ENCRYPTION, 27, 1),
            (OPTION_INSTOPT, 28, 1),
            (OPTION_THREADID, 29, 4),
        ];
        for (i, (token, offset, len)) in expected.into_iter().enumerate() {
            let entry = &payload[i * 5..i * 5 + 5];
            assert_eq!(entry[0], token);
            assert_eq!(u16::from_be_bytes([entry[1], entry[2]]), offset);
            assert_eq!(u16::from_be_bytes([entry[3], entry[4]]), len);
        }
        assert_eq!(payload[20], OPTION_TERMINATOR);
        assert_eq!(payload[27], ENCRYPT_OFF);
    }

    #[test]
    fn test_parse_prelogin_response_version() {
        // SQL Server 2022 (16.0.1000) response with VERSION and ENCRYPTION
        let mut payload = Vec::new();
        payload.extend_from_slice(&[OPTION_VERSION, 0, 11, 0, 6]);
        payload.extend_from_slice(&[OPTION_ENCRYPTION, 0, 17, 0, 1]);
        payload.push(OPTION_TERMINATOR);
        payload.extend_from_slice(&[16, 0, 0x03, 0xE8, 0, 0]);
        payload.push(ENCRYPT_OFF);

        let mut buf = vec![PACKET_TABULAR_RESULT, 1, 0, 0, 0, 0, 1, 0];
        buf.extend_from_slice(&payload);

        assert_eq!(parse_prelogin_version(&buf).as_deref(), Some("16.0.1000"));
    }

    #[test]
    fn test_parse_prelogin_response_garbage() {
        assert!(parse_prelogin_version(&[]).is_none());
        assert!(parse_prelogin_version(b"SSH-2.0-OpenSSH_9.6\r\n").is_none());
        assert!(parse_prelogin_version(&[PACKET_TABULAR_RESULT, 1, 0, 8]).is_none());
        // truncated option table
        let truncated = [PACKET_TABULAR_RESULT, 1, 0, 0, 0, 0, 1, 0, 0, 0];
        assert!(parse_prelogin_version(&truncated).is_none());
    }
}
