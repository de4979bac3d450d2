//! Redis serialization protocol (RESP2), just enough for `AUTH`, `SELECT`,
//! `PING` and `INFO`

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Bulk replies larger than this are rejected
const MAX_BULK_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

/// Encode a command as an array of bulk strings
#[must_use]
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// Read one non-array reply
///
/// # Errors
///
/// Returns an error on EOF, malformed framing or unsupported reply types
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let Some(kind) = line.chars().next() else {
        bail!("empty reply line");
    };
    let rest = line.get(1..).unwrap_or_default();

    match kind {
        '+' => Ok(Reply::Simple(rest.to_string())),
        '-' => Ok(Reply::Error(rest.to_string())),
        ':' => Ok(Reply::Integer(
            rest.parse().with_context(|| format!("invalid integer reply: {rest}"))?,
        )),
        '$' => {
            let len: i64 = rest
                .parse()
                .with_context(|| format!("invalid bulk length: {rest}"))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len).context("invalid bulk length")?;
            if len > MAX_BULK_LEN {
                bail!("bulk reply too large: {len} bytes");
            }
            let mut data = vec![0u8; len + 2];
            reader
                .read_exact(&mut data)
                .await
                .context("failed to read bulk reply")?;
            data.truncate(len);
            Ok(Reply::Bulk(Some(data)))
        }
        other => bail!("unsupported reply type: {other}"),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .context("failed to read reply")?;
    if read == 0 {
        bail!("connection closed by server");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Find `redis_version` in an `INFO` payload
#[must_use]
pub fn parse_server_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix("redis_version:"))
        .map(|v| v.trim().to_string())
}
