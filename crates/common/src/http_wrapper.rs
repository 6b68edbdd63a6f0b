use http::header::{HeaderMap, HeaderName};

/// Read access to a request's headers.
///
/// The resolver only needs get-by-name, so harnesses can plug in any request
/// type without pulling framework types into the core.
pub trait HeaderLookup {
    /// Returns the value of `name`, or `None` when the header is absent or
    /// its value is not valid UTF-8.
    fn get_header(&self, name: &HeaderName) -> Option<&str>;
}

impl HeaderLookup for HeaderMap {
    fn get_header(&self, name: &HeaderName) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}
