use axum::http::HeaderMap;
use std::borrow::Cow;
use sha2::{Digest, Sha256};

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";
pub const FALLBACK_KEY: &str = "localhost";

// Strategy for turning request metadata into a rate limit key
pub trait ClientKeyResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> String;
}

/// Best-effort resolver based on proxy headers.
///
/// Takes the first hop of `X-Forwarded-For`, then `X-Real-IP`, then falls back
/// to a shared `"localhost"` key. Values are not validated as IP addresses, so
/// a client that controls these headers controls its key.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderClientKeyResolver;

impl ClientKeyResolver for HeaderClientKeyResolver {
    fn resolve(&self, headers: &HeaderMap) -> String {
        if let Some(forwarded) = header_str(headers, FORWARDED_FOR) {
            let first = forwarded.split(',').map(|s| s.trim()).next().unwrap_or_default();
            return first.to_string();
        }

        if let Some(real_ip) = header_str(headers, REAL_IP) {
            return real_ip.into_owned();
        }

        FALLBACK_KEY.to_string()
    }
}

// Any present, non-empty header counts, even with non-ASCII bytes in it
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .filter(|value| !value.is_empty())
}

// Short stable fingerprint so logs don't carry raw addresses
pub fn fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}
