//! Transport layer for the DNS proxy.
//!
//! Receives queries from clients and writes resolved replies back. Only a
//! UDP transport exists; the proxy has no TCP fallback.

pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;
