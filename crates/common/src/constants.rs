use http::header::HeaderName;

pub const HEADER_X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const HEADER_X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

// RFC 7239. Rejected as a source header at build time, never parsed.
pub const HEADER_FORWARDED: HeaderName = HeaderName::from_static("forwarded");
