//! Per-request resolution of the real client address.
//!
//! The resolver classifies the connection's peer as trusted or untrusted and
//! only honors client-supplied headers from trusted peers. Resolution never
//! fails: malformed or missing input degrades to the peer address, or to no
//! header write at all, so a misbehaving proxy can produce a wrong address
//! but never a dropped request.

use std::net::{IpAddr, SocketAddr};

use http::header::HeaderName;

use crate::constants::HEADER_X_FORWARDED_FOR;
use crate::http_wrapper::HeaderLookup;
use crate::trust::TrustedRanges;

/// The per-request decision engine. Built once via
/// [`Builder`](crate::builder::Builder), then shared read-only across
/// concurrent resolutions; the trust cache inside is the only mutable state
/// and carries its own locking.
#[derive(Debug)]
pub struct Resolver {
    pub(crate) trusted: TrustedRanges,
    pub(crate) source_header: HeaderName,
    pub(crate) destination_header: HeaderName,
    pub(crate) recursive: bool,
}

impl Resolver {
    /// Header consulted for the client-asserted address.
    pub fn source_header(&self) -> &HeaderName {
        &self.source_header
    }

    /// Header the harness writes the resolved address into.
    pub fn destination_header(&self) -> &HeaderName {
        &self.destination_header
    }

    /// Whether forwarding chains are walked hop by hop.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Resolves the real client address for one request.
    ///
    /// `peer_addr` is the connection peer as reported by the transport: a
    /// bare address or an `address:port` pair, IPv6 with or without brackets.
    /// An unparseable peer is treated as having no address and the request
    /// still resolves.
    ///
    /// Untrusted peers resolve to their own address; headers are never
    /// consulted. Trusted peers resolve from the source header: the
    /// forwarding-chain header is split on commas and walked, any other
    /// header is taken verbatim. An empty candidate falls back to the peer
    /// address. `None` means there is nothing to write.
    pub fn resolve<H: HeaderLookup>(&self, peer_addr: &str, headers: &H) -> Option<String> {
        let peer_ip = parse_peer_addr(peer_addr);
        let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_default();

        if !self.trusted.is_trusted(peer_ip) {
            log::debug!(
                "realip: peer {:?} is outside the trusted ranges, keeping peer address",
                peer_addr
            );
            return (!peer.is_empty()).then_some(peer);
        }

        let value = headers.get_header(&self.source_header).unwrap_or_default();
        let resolved = if self.source_header == HEADER_X_FORWARDED_FOR {
            let entries: Vec<&str> = value.split(',').map(str::trim).collect();
            self.resolve_chain(&entries).to_string()
        } else {
            value.to_string()
        };

        if resolved.is_empty() {
            log::debug!(
                "realip: no usable value in {}, falling back to peer address",
                self.source_header
            );
            return (!peer.is_empty()).then_some(peer);
        }
        Some(resolved)
    }

    /// Picks the client address out of a forwarding chain.
    ///
    /// Non-recursive mode returns the last entry as-is, trusting the
    /// convention that the nearest proxy appended it. That entry itself is
    /// never trust-checked, so a trusted peer's crafted chain is taken at
    /// face value; see the crate documentation.
    ///
    /// Recursive mode walks right to left and returns the first entry that
    /// is not itself a trusted proxy. Entries that do not parse as addresses
    /// are by definition untrusted and come back verbatim. A chain made up
    /// entirely of trusted proxies yields its first entry.
    fn resolve_chain<'a>(&self, entries: &[&'a str]) -> &'a str {
        let Some(&last) = entries.last() else {
            return "";
        };
        if !self.recursive {
            return last;
        }
        for &entry in entries.iter().rev() {
            let ip = entry.parse::<IpAddr>().ok();
            if !self.trusted.is_trusted(ip) {
                return entry;
            }
        }
        entries.first().copied().unwrap_or_default()
    }
}

/// Parses a peer address as reported by the transport, stripping a port if
/// one is present.
fn parse_peer_addr(peer_addr: &str) -> Option<IpAddr> {
    let trimmed = peer_addr.trim();
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Some(ip);
    }
    trimmed.parse::<SocketAddr>().map(|addr| addr.ip()).ok()
}
