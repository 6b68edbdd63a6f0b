//! Validated construction of a [`Resolver`].

use std::net::IpAddr;

use error_stack::Report;
use http::header::HeaderName;
use ipnet::IpNet;

use crate::constants::{HEADER_FORWARDED, HEADER_X_REAL_IP};
use crate::error::RealIpError;
use crate::resolver::Resolver;
use crate::settings::ResolverSettings;
use crate::trust::TrustedRanges;

/// Assembles a [`Resolver`] from header names, trusted ranges, and the
/// recursion flag.
///
/// Setter errors are latched: the first failure is kept, every later call is
/// a no-op, and the error surfaces from [`Builder::build`]. Defaults follow
/// the common deployment: `x-real-ip` as both source and destination header,
/// no trusted ranges (every peer trusted), non-recursive.
#[derive(Debug)]
pub struct Builder {
    source_header: HeaderName,
    destination_header: HeaderName,
    trusted: Vec<IpNet>,
    recursive: bool,
    err: Option<Report<RealIpError>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            source_header: HEADER_X_REAL_IP,
            destination_header: HEADER_X_REAL_IP,
            trusted: Vec::new(),
            recursive: false,
            err: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a settings section through the regular setters, so the same
    /// validation and error latching applies.
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        let mut builder = Self::new()
            .source_header(&settings.source_header)
            .destination_header(&settings.destination_header)
            .recursive(settings.recursive);
        for range in &settings.trusted_ranges {
            builder = builder.trusted_range(range);
        }
        builder
    }

    /// Sets the header the client-asserted address is read from. The name is
    /// trimmed and lower-cased; `forwarded` is rejected because its
    /// structured format would be silently misread as a plain address list.
    pub fn source_header(mut self, name: &str) -> Self {
        if self.err.is_some() {
            return self;
        }
        match parse_header_name(name) {
            Ok(header) if header == HEADER_FORWARDED => {
                self.err = Some(Report::new(RealIpError::UnsupportedSourceHeader));
            }
            Ok(header) => self.source_header = header,
            Err(report) => self.err = Some(report),
        }
        self
    }

    /// Sets the header the resolved address is written to.
    pub fn destination_header(mut self, name: &str) -> Self {
        if self.err.is_some() {
            return self;
        }
        match parse_header_name(name) {
            Ok(header) => self.destination_header = header,
            Err(report) => self.err = Some(report),
        }
        self
    }

    /// Appends trusted networks. Ranges are checked in the order added; no
    /// deduplication. Leaving the list empty trusts every peer.
    pub fn trusted_ranges<I>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = IpNet>,
    {
        if self.err.is_some() {
            return self;
        }
        self.trusted.extend(ranges);
        self
    }

    /// Appends one trusted network given in CIDR form (`10.0.0.0/8`) or as a
    /// bare address, meaning that single host.
    pub fn trusted_range(mut self, range: &str) -> Self {
        if self.err.is_some() {
            return self;
        }
        match parse_range(range) {
            Ok(net) => self.trusted.push(net),
            Err(report) => self.err = Some(report),
        }
        self
    }

    /// Walk forwarding chains hop by hop instead of taking the last entry.
    pub fn recursive(mut self, recursive: bool) -> Self {
        if self.err.is_some() {
            return self;
        }
        self.recursive = recursive;
        self
    }

    /// Freezes the configuration into an immutable [`Resolver`] with a fresh
    /// trust cache.
    ///
    /// # Errors
    ///
    /// Returns the first error any setter latched: an unsupported or invalid
    /// header name, or an unparseable trusted range.
    pub fn build(self) -> Result<Resolver, Report<RealIpError>> {
        if let Some(err) = self.err {
            return Err(err);
        }
        log::debug!(
            "realip: resolver configured with {} trusted range(s), source={}, destination={}, recursive={}",
            self.trusted.len(),
            self.source_header,
            self.destination_header,
            self.recursive
        );
        Ok(Resolver {
            trusted: TrustedRanges::new(self.trusted),
            source_header: self.source_header,
            destination_header: self.destination_header,
            recursive: self.recursive,
        })
    }
}

pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName, Report<RealIpError>> {
    let normalized = name.trim().to_ascii_lowercase();
    HeaderName::from_bytes(normalized.as_bytes()).map_err(|_| {
        Report::new(RealIpError::InvalidHeaderName {
            name: name.to_string(),
        })
    })
}

pub(crate) fn parse_range(range: &str) -> Result<IpNet, Report<RealIpError>> {
    let trimmed = range.trim();
    if let Ok(net) = trimmed.parse::<IpNet>() {
        return Ok(net);
    }
    trimmed
        .parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| {
            Report::new(RealIpError::InvalidTrustedRange {
                range: range.to_string(),
            })
        })
}
