//! Remote address handling.

use crate::error::AddrError;

/// Splits `host:port` or `[host]:port` into its host and port parts.
///
/// IPv6 literals must be bracketed. The port may be empty, the host may be
/// a name or an IP literal; neither is validated beyond its shape.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), AddrError> {
    let colon = addr.rfind(':').ok_or(AddrError::MissingPort)?;

    let (host, host_start, host_end) = if addr.starts_with('[') {
        let end = addr.find(']').ok_or(AddrError::MissingBracket)?;
        if end + 1 == addr.len() {
            // "[::1]" with nothing after the bracket
            return Err(AddrError::MissingPort);
        }
        if end + 1 != colon {
            // either ']' is not followed by ':' or there is more than one ':' after it
            return Err(if addr.as_bytes()[end + 1] == b':' {
                AddrError::TooManyColons
            } else {
                AddrError::MissingPort
            });
        }
        (&addr[1..end], 1, end + 1)
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(AddrError::TooManyColons);
        }
        (host, 0, 0)
    };

    if addr[host_start..].contains('[') {
        return Err(AddrError::UnexpectedBracket);
    }
    if addr[host_end..].contains(']') {
        return Err(AddrError::UnexpectedBracket);
    }

    Ok((host, &addr[colon + 1..]))
}

/// Host part of `raw`, or `raw` itself when it cannot be split.
pub fn client_ip(raw: &str) -> String {
    match split_host_port(raw) {
        Ok((host, _)) => host.to_string(),
        Err(_) => raw.to_string(),
    }
}
