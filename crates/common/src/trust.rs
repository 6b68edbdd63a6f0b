//! Trusted-range membership with a positive-result cache.
//!
//! Trust evaluation runs on every request, usually against the same handful
//! of proxy addresses (a front-of-stack load balancer rarely changes its
//! address). The cache turns the linear range scan into a set lookup for
//! steady-state traffic. Only proven members are cached; a negative answer is
//! re-evaluated on every call and the cache is never evicted.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock};

use ipnet::IpNet;

/// Set of addresses already proven to lie inside a trusted range.
///
/// Many concurrent readers, occasional writer on a cache miss. The write lock
/// is held only for the duration of a single insert, never across the range
/// scan.
#[derive(Debug, Default)]
pub struct TrustCache {
    inner: RwLock<HashSet<IpAddr>>,
}

impl TrustCache {
    fn contains(&self, ip: &IpAddr) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(ip)
    }

    fn insert(&self, ip: IpAddr) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ip);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// An ordered list of trusted networks plus the cache of addresses already
/// proven to belong to one of them. One instance per resolver; never shared
/// process-wide.
#[derive(Debug)]
pub struct TrustedRanges {
    ranges: Vec<IpNet>,
    cache: TrustCache,
}

impl TrustedRanges {
    pub fn new(ranges: Vec<IpNet>) -> Self {
        Self {
            ranges,
            cache: TrustCache::default(),
        }
    }

    /// Whether every peer is trusted because no ranges were configured.
    pub fn trusts_all(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `ip` belongs to a trusted range.
    ///
    /// An empty range list trusts everything, including peers that had no
    /// parseable address. With ranges configured, `None` is never trusted:
    /// containment is unsatisfiable without an address.
    pub fn is_trusted(&self, ip: Option<IpAddr>) -> bool {
        if self.ranges.is_empty() {
            return true;
        }
        let Some(ip) = ip else {
            return false;
        };
        if self.cache.contains(&ip) {
            return true;
        }
        // The scan runs unlocked. Two racing lookups of the same fresh
        // address may both scan and both insert; the inserts are idempotent.
        if self.ranges.iter().any(|range| range.contains(&ip)) {
            self.cache.insert(ip);
            return true;
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
