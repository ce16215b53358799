//! DNS proxy orchestration.
//!
//! Wires the resolver to its transport and runs the proxy server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::resolver::Resolver;
use crate::transport::udp::UdpTransport;
use crate::upstream::DohClient;

/// Configuration for the DNS proxy.
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:53)
    pub bind_addr: SocketAddr,
    /// DoH endpoint the cache misses are resolved against
    pub doh_url: String,
    /// SOCKS5 proxy (host:port) all upstream traffic is tunneled through
    pub socks_addr: String,
    /// Bound on one whole upstream round trip
    pub upstream_timeout: Duration,
    /// How long to cache NXDOMAIN answers
    pub nxdomain_ttl: Duration,
    /// How long to cache other answerless responses
    pub failure_ttl: Duration,
}

/// Run the DNS proxy with the given configuration.
///
/// Binds the UDP transport, spawns the periodic maintenance task, and
/// serves indefinitely.
pub async fn run(config: ProxyConfig) -> io::Result<()> {
    let upstream = DohClient::new(
        config.doh_url.clone(),
        &config.socks_addr,
        config.upstream_timeout,
    )
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let resolver = Arc::new(Resolver::new(
        upstream,
        config.nxdomain_ttl,
        config.failure_ttl,
    ));

    let udp = UdpTransport::bind(config.bind_addr).await?;

    info!(addr = %config.bind_addr, "DNS proxy listening");
    info!(
        url = %config.doh_url,
        socks = %config.socks_addr,
        "resolving over DoH through SOCKS5"
    );

    // Every minute: log a stats snapshot and sweep expired cache entries.
    let maintenance = resolver.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let swept = maintenance.sweep_cache();
            let stats = maintenance.stats_snapshot_and_reset();
            info!(
                cache = maintenance.cache_len(),
                swept,
                requests = stats.requests,
                hits = stats.hits,
                misses = stats.misses,
                failures = stats.failures,
                avg_response_ms = %format_args!("{:.2}", stats.avg_response_ms),
                "stats"
            );
        }
    });

    udp.run(resolver).await
}
