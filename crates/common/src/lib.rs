//! Real client IP resolution behind trusted reverse proxies.
//!
//! A request that arrives through one or more proxies carries its original
//! client address in a forwarding header, but that header is only as
//! trustworthy as the peer that sent it. This crate decides, per request,
//! which address to believe: it classifies the connection peer against a
//! configured set of trusted networks and only then consults the configured
//! source header, walking a comma-separated forwarding chain when asked to.
//! The resolved address is handed back to the serving harness to be written
//! into a destination header. Resolution never fails a request; malformed
//! input degrades to the peer address or to no header write.
//!
//! One caveat worth knowing up front: in non-recursive mode the last chain
//! entry is honored without a trust check of its own, so a trusted peer that
//! sends a crafted chain is taken at face value for that entry. That follows
//! the convention that the nearest proxy appended the last hop; run recursive
//! mode if the chain itself cannot be trusted.
//!
//! # Modules
//!
//! - [`builder`]: Validated construction of a [`resolver::Resolver`]
//! - [`constants`]: Header names with resolver-defined semantics
//! - [`error`]: Error types for configuration assembly
//! - [`http_wrapper`]: Header lookup abstraction over request types
//! - [`resolver`]: The per-request resolution algorithm
//! - [`settings`]: Layered configuration loading and validation
//! - [`test_support`]: Testing utilities
//! - [`trust`]: Trusted ranges and the membership cache

pub mod builder;
pub mod constants;
pub mod error;
pub mod http_wrapper;
pub mod resolver;
pub mod settings;
pub mod trust;
