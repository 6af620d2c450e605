//! Client address extraction
//!
//! Participants are anonymous, so the peer address is only used to tag
//! connection logs. Proxy headers are honored when they hold a valid IP.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::HeaderMap};

/// Best-effort client IP for logging
///
/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`, then the socket
/// peer address.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    if let Some(ip) = header_ip(headers, "x-forwarded-for", |value| value.split(',').next()) {
        return ip.to_string();
    }

    if let Some(ip) = header_ip(headers, "x-real-ip", Some) {
        return ip.to_string();
    }

    connect_info
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_ip<'a>(
    headers: &'a HeaderMap,
    name: &str,
    pick: impl FnOnce(&'a str) -> Option<&'a str>,
) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    pick(value)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(extract_client_ip(&headers, None), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_client_ip(&headers, None), "198.51.100.4");
    }

    #[test]
    fn test_peer_address_fallback() {
        let headers = HeaderMap::new();
        let peer = ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 51000)));
        assert_eq!(extract_client_ip(&headers, Some(&peer)), "192.0.2.1");
        assert_eq!(extract_client_ip(&headers, None), "unknown");
    }
}
