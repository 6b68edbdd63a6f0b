//! Layered configuration: embedded TOML defaults, overridden by
//! `REALIP__`-prefixed environment variables, validated before use.

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::builder::{parse_header_name, parse_range};
use crate::constants::{HEADER_FORWARDED, HEADER_X_REAL_IP};
use crate::error::RealIpError;

/// The `[resolver]` section.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolverSettings {
    /// Header the client-asserted address is read from.
    #[serde(default = "default_real_ip_header")]
    #[validate(custom(function = validate_source_header))]
    pub source_header: String,

    /// Header the resolved address is written to.
    #[serde(default = "default_real_ip_header")]
    #[validate(custom(function = validate_header_name))]
    pub destination_header: String,

    /// CIDR blocks or bare addresses. Empty trusts every peer.
    #[serde(default)]
    #[validate(custom(function = validate_trusted_ranges))]
    pub trusted_ranges: Vec<String>,

    /// Walk forwarding chains hop by hop.
    #[serde(default)]
    pub recursive: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            source_header: default_real_ip_header(),
            destination_header: default_real_ip_header(),
            trusted_ranges: Vec::new(),
            recursive: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub resolver: ResolverSettings,
}

impl Settings {
    /// Loads the embedded defaults plus any environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when an override cannot be parsed or
    /// the merged settings fail validation.
    pub fn new() -> Result<Self, Report<RealIpError>> {
        Self::from_toml(include_str!("../../../realip.toml"))
    }

    /// Loads settings from TOML content plus any environment overrides.
    ///
    /// Overrides use the `REALIP` prefix with `__` as the path separator,
    /// e.g. `REALIP__RESOLVER__RECURSIVE=true`. `trusted_ranges` accepts a
    /// comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the TOML is malformed, an override
    /// cannot be parsed, or the merged settings fail validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<RealIpError>> {
        let environment = Environment::default()
            .prefix("REALIP")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("resolver.trusted_ranges");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(RealIpError::Configuration {
                message: "failed to read configuration sources".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(RealIpError::Configuration {
                    message: "failed to deserialize settings".to_string(),
                })?;

        settings
            .validate()
            .change_context(RealIpError::Configuration {
                message: "settings validation failed".to_string(),
            })?;

        Ok(settings)
    }
}

fn default_real_ip_header() -> String {
    HEADER_X_REAL_IP.as_str().to_string()
}

fn validate_header_name(name: &str) -> Result<(), ValidationError> {
    parse_header_name(name).map_err(|_| ValidationError::new("invalid_header_name"))?;
    Ok(())
}

fn validate_source_header(name: &str) -> Result<(), ValidationError> {
    let header = parse_header_name(name).map_err(|_| ValidationError::new("invalid_header_name"))?;
    if header == HEADER_FORWARDED {
        return Err(ValidationError::new("unsupported_source_header"));
    }
    Ok(())
}

fn validate_trusted_ranges(ranges: &[String]) -> Result<(), ValidationError> {
    for range in ranges {
        parse_range(range).map_err(|_| ValidationError::new("invalid_trusted_range"))?;
    }
    Ok(())
}
