//! Tower middleware that resolves the real client address.
//!
//! [`RealIpLayer`] wraps a [`Resolver`] and rewrites the configured
//! destination header on every request before the inner service sees it:
//! requests from untrusted peers get the peer's own address, requests from
//! trusted peers get the address extracted from the source header. When
//! nothing usable is found the header is left untouched and the request
//! passes through unchanged; resolution never rejects a request.
//!
//! The peer address is read from the [`ConnectInfo`] request extension, so
//! the server must be started with
//! [`Router::into_make_service_with_connect_info`]. A request without the
//! extension is treated as having no peer address.
//!
//! # Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//!
//! use axum::{routing::get, Router};
//! use realip_axum::RealIpLayer;
//! use realip_common::builder::Builder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolver = Builder::new()
//!     .source_header("x-forwarded-for")
//!     .trusted_range("10.0.0.0/8")
//!     .recursive(true)
//!     .build()
//!     .expect("valid resolver configuration");
//!
//! let app = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .layer(RealIpLayer::new(resolver));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
//!     .await
//!     .expect("bind");
//! axum::serve(
//!     listener,
//!     app.into_make_service_with_connect_info::<SocketAddr>(),
//! )
//! .await
//! .expect("server error");
//! # }
//! ```
//!
//! [`Router::into_make_service_with_connect_info`]: axum::Router::into_make_service_with_connect_info

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use error_stack::Report;
use http::{HeaderValue, Request};
use tower::{Layer, Service};

use realip_common::builder::Builder;
use realip_common::error::RealIpError;
use realip_common::resolver::Resolver;
use realip_common::settings::Settings;

/// Applies real-client-IP resolution to every request passing through.
#[derive(Clone, Debug)]
pub struct RealIpLayer {
    resolver: Arc<Resolver>,
}

impl RealIpLayer {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Builds the resolver from a loaded [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the settings name an unsupported
    /// or invalid header, or an unparseable trusted range.
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<RealIpError>> {
        Builder::from_settings(&settings.resolver).build().map(Self::new)
    }
}

impl<S> Layer<S> for RealIpLayer {
    type Service = RealIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RealIpService {
            inner,
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// Service produced by [`RealIpLayer`]. Resolution is synchronous, so the
/// inner service's future is returned as-is.
#[derive(Clone, Debug)]
pub struct RealIpService<S> {
    inner: S,
    resolver: Arc<Resolver>,
}

impl<S, B> Service<Request<B>> for RealIpService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        if let Some(resolved) = self.resolver.resolve(&peer, req.headers()) {
            match HeaderValue::from_str(&resolved) {
                Ok(value) => {
                    req.headers_mut()
                        .insert(self.resolver.destination_header(), value);
                }
                Err(_) => {
                    log::warn!(
                        "realip: resolved value {:?} is not a valid header value, leaving {} alone",
                        resolved,
                        self.resolver.destination_header()
                    );
                }
            }
        }

        self.inner.call(req)
    }
}
