//! # Host name resolution.
//!
//! [`DnsResolver`] turns a host name into IP addresses before a connection is
//! opened. Resolvers carry no lifecycle: the container never starts or stops them.
//!
//! | Resolver                  | Behavior                                   |
//! |---------------------------|--------------------------------------------|
//! | [`SystemDnsResolver`]     | OS resolver via `tokio::net::lookup_host`  |
//! | [`StaticDnsResolver`]     | fixed host table                           |
//! | [`UnresolvedDnsResolver`] | IP literals only, never looks anything up  |
//!
//! Every resolver answers IP literals directly.

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;

use async_trait::async_trait;

/// # Resolves host names to addresses.
#[async_trait]
pub trait DnsResolver: Send + Sync + 'static {
    /// Returns every address of `host`, in resolver order.
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

fn literal(host: &str) -> Option<IpAddr> {
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    trimmed.parse().ok()
}

fn not_found(host: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve host `{host}`"))
}

/// Resolver backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDnsResolver;

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Some(ip) = literal(host) {
            return Ok(vec![ip]);
        }
        let mut out: Vec<IpAddr> = Vec::new();
        for addr in tokio::net::lookup_host((host, 0)).await? {
            if !out.contains(&addr.ip()) {
                out.push(addr.ip());
            }
        }
        if out.is_empty() {
            return Err(not_found(host));
        }
        Ok(out)
    }
}

/// Resolver answering from a fixed table.
#[derive(Debug, Default, Clone)]
pub struct StaticDnsResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticDnsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the addresses of `host`. Host names are case-insensitive.
    pub fn with_host(mut self, host: impl AsRef<str>, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        self.hosts
            .insert(host.as_ref().to_ascii_lowercase(), addrs.into_iter().collect());
        self
    }
}

#[async_trait]
impl DnsResolver for StaticDnsResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Some(ip) = literal(host) {
            return Ok(vec![ip]);
        }
        match self.hosts.get(&host.to_ascii_lowercase()) {
            Some(addrs) if !addrs.is_empty() => Ok(addrs.clone()),
            _ => Err(not_found(host)),
        }
    }
}

/// Resolver that accepts IP literals only.
///
/// For deployments where name resolution happens elsewhere (proxies, service meshes).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnresolvedDnsResolver;

#[async_trait]
impl DnsResolver for UnresolvedDnsResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        literal(host).map(|ip| vec![ip]).ok_or_else(|| not_found(host))
    }
}
