//! Endpoint normalization.
//!
//! Turns free-form user input (`localhost:4141`, `http://host:1234/`,
//! `https://example.com/api/usage`) into a canonical absolute URL plus, for
//! loopback hosts, a fallback URL that swaps `localhost` and `127.0.0.1`.

use std::net::Ipv4Addr;

use url::{Host, Url};

use crate::error::EndpointError;

/// Built-in endpoint of the local usage service.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4141/usage";

/// Path used when the input has none.
pub const DEFAULT_PATH: &str = "/usage";

const LOCALHOST: &str = "localhost";
const LOOPBACK_V4: &str = "127.0.0.1";

/// A validated endpoint with its optional loopback fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub primary: Url,
    pub fallback: Option<Url>,
    /// Display form, persistence value, and equality key.
    pub canonical: String,
}

impl EndpointConfig {
    /// The built-in default endpoint.
    ///
    /// # Panics
    ///
    /// Panics if [`DEFAULT_ENDPOINT`] itself fails to normalize, which can
    /// only happen if the constant is edited into something invalid.
    #[must_use]
    pub fn default_endpoint() -> Self {
        normalize(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT must normalize")
    }

    /// Whether this is the built-in default endpoint.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.canonical == DEFAULT_ENDPOINT
    }
}

impl std::fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Normalize user input into an [`EndpointConfig`].
///
/// Steps: trim, default the scheme to `http`, require a host, default an
/// empty or `/` path to [`DEFAULT_PATH`], then derive the loopback fallback.
/// Normalizing a canonical string yields the same config again.
///
/// # Errors
///
/// - [`EndpointError::EmptyInput`] for blank input
/// - [`EndpointError::InvalidUrl`] when the text does not parse
/// - [`EndpointError::MissingHost`] when the parsed URL has no host
pub fn normalize(input: &str) -> Result<EndpointConfig, EndpointError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::EmptyInput);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let mut primary =
        Url::parse(&candidate).map_err(|e| EndpointError::InvalidUrl(e.to_string()))?;

    match primary.host_str() {
        None | Some("") => return Err(EndpointError::MissingHost),
        Some(_) => {}
    }

    if primary.path().is_empty() || primary.path() == "/" {
        primary.set_path(DEFAULT_PATH);
    }

    let fallback = loopback_fallback(&primary);
    let canonical = primary.to_string();

    Ok(EndpointConfig {
        primary,
        fallback,
        canonical,
    })
}

/// Swap `localhost` and `127.0.0.1`; other hosts have no fallback.
fn loopback_fallback(url: &Url) -> Option<Url> {
    let replacement = match url.host()? {
        Host::Domain(domain) if domain.eq_ignore_ascii_case(LOCALHOST) => LOOPBACK_V4,
        Host::Ipv4(addr) if addr == Ipv4Addr::LOCALHOST => LOCALHOST,
        _ => return None,
    };

    let mut fallback = url.clone();
    fallback.set_host(Some(replacement)).ok()?;
    Some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_input_rejected() {
        assert_eq!(normalize(""), Err(EndpointError::EmptyInput));
        assert_eq!(normalize("   \n\t"), Err(EndpointError::EmptyInput));
    }

    #[test]
    fn scheme_defaults_to_http() {
        let config = normalize("localhost:4141").unwrap();
        assert_eq!(config.primary.scheme(), "http");
        assert_eq!(config.canonical, "http://localhost:4141/usage");
    }

    #[test]
    fn https_is_preserved() {
        let config = normalize("https://example.com/api").unwrap();
        assert_eq!(config.canonical, "https://example.com/api");
    }

    #[test]
    fn default_path_injected() {
        assert_eq!(normalize("http://host:1234").unwrap().primary.path(), "/usage");
        assert_eq!(normalize("http://host:1234/").unwrap().primary.path(), "/usage");
    }

    #[test]
    fn custom_path_preserved() {
        assert_eq!(
            normalize("http://host:1234/custom").unwrap().primary.path(),
            "/custom"
        );
    }

    #[test]
    fn input_is_trimmed() {
        let config = normalize("  http://192.168.1.100:8080  ").unwrap();
        assert_eq!(config.canonical, "http://192.168.1.100:8080/usage");
    }

    #[test]
    fn localhost_falls_back_to_loopback() {
        let config = normalize("localhost:4141").unwrap();
        let fallback = config.fallback.unwrap();
        assert_eq!(fallback.host_str(), Some("127.0.0.1"));
        assert_eq!(fallback.port(), Some(4141));
        assert_eq!(fallback.path(), "/usage");
    }

    #[test]
    fn localhost_match_is_case_insensitive() {
        let config = normalize("http://LocalHost:4141").unwrap();
        assert_eq!(
            config.fallback.and_then(|u| u.host_str().map(str::to_string)),
            Some("127.0.0.1".to_string())
        );
    }

    #[test]
    fn loopback_falls_back_to_localhost() {
        let config = normalize("127.0.0.1:4141").unwrap();
        assert_eq!(config.fallback.unwrap().host_str(), Some("localhost"));
    }

    #[test]
    fn remote_host_has_no_fallback() {
        assert!(normalize("example.com").unwrap().fallback.is_none());
        assert!(normalize("10.0.0.5:4141").unwrap().fallback.is_none());
    }

    #[test]
    fn unparseable_input_is_invalid_url() {
        assert!(matches!(
            normalize("not a valid url"),
            Err(EndpointError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize("http://host:99999"),
            Err(EndpointError::InvalidUrl(_))
        ));
    }

    #[test]
    fn missing_host_rejected() {
        let err = normalize("http://").unwrap_err();
        assert!(matches!(
            err,
            EndpointError::InvalidUrl(_) | EndpointError::MissingHost
        ));
        assert_eq!(normalize("unix:///tmp/sock"), Err(EndpointError::MissingHost));
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "localhost:4141",
            "127.0.0.1:4141/",
            "http://host:1234",
            "https://Example.COM/v1/usage?team=a",
            "  http://192.168.1.100:8080  ",
            "custom-host",
        ];
        for input in inputs {
            let first = normalize(input).unwrap();
            let second = normalize(&first.canonical).unwrap();
            assert_eq!(first, second, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn default_endpoint_is_canonical() {
        let config = EndpointConfig::default_endpoint();
        assert_eq!(config.canonical, DEFAULT_ENDPOINT);
        assert!(config.is_default());
        assert!(config.fallback.is_some());
    }
}
