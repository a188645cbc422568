//! Upstream target resolution.
//!
//! The vendor API address is parsed once at startup. Anything other than a
//! bare `http://host[:port]` is rejected so the proxy never serves against a
//! half-understood upstream.

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use axum::http::HeaderValue;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors raised while resolving the upstream address.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream address '{address}': {source}")]
    Parse {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported upstream scheme '{0}' (only http is supported)")]
    UnsupportedScheme(String),

    #[error("upstream address '{0}' has no host")]
    MissingHost(String),

    #[error("upstream address '{0}' must not carry a path, query, fragment or credentials")]
    UnexpectedComponent(String),

    #[error("invalid upstream authority '{0}'")]
    Authority(String),
}

/// Validated scheme and authority of the vendor API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamTarget {
    /// Parse and validate a base address such as `http://api.eu-pet.com`.
    pub fn parse(address: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(address.trim()).map_err(|source| UpstreamError::Parse {
            address: address.to_string(),
            source,
        })?;

        if url.scheme() != "http" {
            return Err(UpstreamError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UpstreamError::MissingHost(address.to_string()))?;

        if url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
            || url.password().is_some()
        {
            return Err(UpstreamError::UnexpectedComponent(address.to_string()));
        }

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|_| UpstreamError::Authority(authority.clone()))?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    /// Authority used for the outbound URI and `Host` header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `Host` header value for outbound requests.
    pub fn host_header(&self) -> HeaderValue {
        HeaderValue::from_str(self.authority.as_str())
            .unwrap_or_else(|_| HeaderValue::from_static("localhost"))
    }

    /// Outbound URI for the given inbound path and query.
    pub fn uri_for(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
