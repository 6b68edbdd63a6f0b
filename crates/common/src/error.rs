use derive_more::{Display, Error};

/// Errors surfaced while assembling a resolver configuration.
///
/// Per-request resolution has no error type at all: malformed input degrades
/// to a fallback value instead of failing the request.
#[derive(Debug, Display, Error)]
pub enum RealIpError {
    /// The structured `Forwarded` header was selected as the source header.
    #[display("`forwarded` is not supported as a source header")]
    UnsupportedSourceHeader,

    /// A header name is empty or contains invalid characters.
    #[display("invalid header name: {name:?}")]
    InvalidHeaderName { name: String },

    /// A trusted range is neither a CIDR block nor a bare address.
    #[display("invalid trusted range: {range:?}")]
    InvalidTrustedRange { range: String },

    /// Settings could not be loaded or failed validation.
    #[display("configuration error: {message}")]
    Configuration { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RealIpError::UnsupportedSourceHeader.to_string(),
            "`forwarded` is not supported as a source header"
        );
        assert_eq!(
            RealIpError::InvalidHeaderName {
                name: "bad header".to_string()
            }
            .to_string(),
            "invalid header name: \"bad header\""
        );
        assert_eq!(
            RealIpError::InvalidTrustedRange {
                range: "10.0.0.0/99".to_string()
            }
            .to_string(),
            "invalid trusted range: \"10.0.0.0/99\""
        );
        assert_eq!(
            RealIpError::Configuration {
                message: "test".to_string()
            }
            .to_string(),
            "configuration error: test"
        );
    }
}
