//! Request-side state of one dispatch.
//!
//! - [`RequestContext`]: the raw request plus its parsed URL, host and query
//! - [`ParsedUrl`]: the serializable URL snapshot
//! - [`PathParams`]: route parameters, bound once a route has been matched

use std::collections::HashMap;

use fast_http::protocol::RequestHeader;
use http::uri::Authority;
use http::{HeaderMap, Method, Uri, Version};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;
use url::Url;

use crate::error::DispatchError;
use crate::path::{PathMatcher, normalize_path};

const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_HOST: &str = "localhost";

/// The URL of a request resolved against its `Host`, with query and route parameters.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedUrl {
    /// The full absolute URL.
    pub href: String,
    /// Hostname plus the port when it is not the protocol default.
    pub host: String,
    pub hostname: String,
    pub port: u16,
    /// The path with one trailing `/` stripped, except for the root path.
    pub pathname: String,
    /// The query string including its leading `?`, empty when there is none.
    pub search: String,
    /// Decoded query pairs; a repeated key keeps its last value.
    pub query: HashMap<String, String>,
    pub params: PathParams,
}

/// Everything the router and handlers know about one in-flight request.
#[derive(Debug)]
pub struct RequestContext {
    raw: RequestHeader,
    parsed: ParsedUrl,
    protocol: String,
    route_path: Option<String>,
}

impl RequestContext {
    /// Parses `raw` assuming plain `http` unless the request target says otherwise.
    pub fn new(raw: RequestHeader) -> Result<Self, DispatchError> {
        Self::with_protocol(raw, None)
    }

    /// Parses `raw`, resolving a relative request target with the declared `protocol`.
    ///
    /// An absolute request target keeps its own scheme. Otherwise the `Host` header only
    /// supplies the authority, and must parse as one; the path and query always come
    /// from the request target. A missing `Host` header falls back to `localhost`.
    pub fn with_protocol(raw: RequestHeader, protocol: Option<&str>) -> Result<Self, DispatchError> {
        let uri = raw.uri();

        let protocol = uri
            .scheme_str()
            .or(protocol)
            .map(|protocol| protocol.trim_end_matches(':').to_ascii_lowercase())
            .filter(|protocol| !protocol.is_empty())
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_owned());

        let url = if uri.scheme().is_some() && uri.authority().is_some() {
            let href = uri.to_string();
            Url::parse(&href).map_err(|source| DispatchError::invalid_url(href.as_str(), source))?
        } else {
            let authority = match raw.host() {
                Some(host) => host.parse::<Authority>().map_err(|source| DispatchError::invalid_host(host, source))?,
                None => uri.authority().cloned().unwrap_or_else(|| Authority::from_static(DEFAULT_HOST)),
            };

            let origin = format!("{protocol}://{authority}/");
            let mut url = Url::parse(&origin).map_err(|source| DispatchError::invalid_url(origin.as_str(), source))?;
            url.set_path(uri.path());
            url.set_query(uri.query());
            url
        };

        let parsed = ParsedUrl::from_url(&url);

        Ok(Self { raw, parsed, protocol, route_path: None })
    }

    /// The raw request head
    pub fn request_header(&self) -> &RequestHeader {
        &self.raw
    }

    pub fn method(&self) -> &Method {
        self.raw.method()
    }

    pub fn uri(&self) -> &Uri {
        self.raw.uri()
    }

    pub fn version(&self) -> Version {
        self.raw.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    pub fn parsed(&self) -> &ParsedUrl {
        &self.parsed
    }

    pub fn href(&self) -> &str {
        &self.parsed.href
    }

    pub fn host(&self) -> &str {
        &self.parsed.host
    }

    pub fn hostname(&self) -> &str {
        &self.parsed.hostname
    }

    pub fn port(&self) -> u16 {
        self.parsed.port
    }

    /// The lower-cased protocol without its trailing `:`, e.g. `http`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn pathname(&self) -> &str {
        &self.parsed.pathname
    }

    pub fn search(&self) -> &str {
        &self.parsed.search
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.parsed.query
    }

    /// Route parameters; empty until a route has been bound.
    pub fn params(&self) -> &PathParams {
        &self.parsed.params
    }

    /// The template of the matched route, once bound.
    pub fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    /// Binds the matched route and extracts its parameters from the pathname.
    ///
    /// The route can be bound once per request; rebinding to another template is ignored.
    pub fn bind_route_path(&mut self, matcher: &PathMatcher) {
        if let Some(bound) = &self.route_path {
            if bound != matcher.template() {
                warn!(bound = %bound, rejected = matcher.template(), "route path already bound, ignore rebinding");
            }
            return;
        }

        self.parsed.params = matcher.extract(&self.parsed.pathname).unwrap_or_default();
        self.route_path = Some(matcher.template().to_owned());
    }
}

impl ParsedUrl {
    fn from_url(url: &Url) -> Self {
        let hostname = url.host_str().unwrap_or_default().to_owned();
        let host = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.clone(),
        };

        Self {
            href: url.as_str().to_owned(),
            host,
            hostname,
            port: url.port_or_known_default().unwrap_or(80),
            pathname: normalize_path(url.path()).to_owned(),
            search: url.query().filter(|query| !query.is_empty()).map(|query| format!("?{query}")).unwrap_or_default(),
            query: url.query_pairs().into_owned().collect(),
            params: PathParams::default(),
        }
    }
}

/// Named route parameters in template order; an optional parameter that did not
/// appear in the path is present with no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, Option<String>)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The value of parameter `key`, `None` when it is undeclared or absent.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.entries.iter().find(|(name, _)| name == key).and_then(|(_, value)| value.as_deref())
    }

    /// Whether `key` is a declared parameter, with or without a value.
    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        let key = key.as_ref();
        self.entries.iter().any(|(name, _)| name == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

impl FromIterator<(String, Option<String>)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (String, Option<String>)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
