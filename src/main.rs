use clap::Parser;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use burrow::proxy::{self, ProxyConfig};

#[derive(Parser)]
#[command(name = "burrow")]
#[command(about = "Caching DNS proxy that resolves over DoH through a SOCKS5 tunnel", long_about = None)]
struct Args {
    /// Local port to listen on
    #[arg(short, long, default_value = "53")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// DoH endpoint URL
    #[arg(long, default_value = "https://cloudflare-dns.com/dns-query")]
    doh_url: String,

    /// SOCKS5 proxy (host:port) to tunnel upstream traffic through
    #[arg(short, long, default_value = "127.0.0.1:10808")]
    socks: String,

    /// Upstream request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Seconds to cache NXDOMAIN answers
    #[arg(long, default_value = "60")]
    nxdomain_ttl: u64,

    /// Seconds to cache other answerless responses
    #[arg(long, default_value = "30")]
    failure_ttl: u64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .expect("invalid bind address");

    let config = ProxyConfig {
        bind_addr,
        doh_url: args.doh_url,
        socks_addr: args.socks,
        upstream_timeout: Duration::from_secs(args.timeout),
        nxdomain_ttl: Duration::from_secs(args.nxdomain_ttl),
        failure_ttl: Duration::from_secs(args.failure_ttl),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(proxy::run(config))
}
