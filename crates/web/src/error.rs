use thiserror::Error;

/// Errors raised while registering or resolving routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("method '{method}' not supported")]
    MethodNotSupported { method: String },

    #[error("invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("route '{template}' needs at least one handler")]
    MissingHandler { template: String },
}

impl RouteError {
    pub fn method_not_supported<S: ToString>(method: S) -> Self {
        Self::MethodNotSupported { method: method.to_string() }
    }

    pub fn invalid_template<S: ToString>(template: &str, reason: S) -> Self {
        Self::InvalidTemplate { template: template.to_owned(), reason: reason.to_string() }
    }

    pub fn missing_handler(template: &str) -> Self {
        Self::MissingHandler { template: template.to_owned() }
    }
}

/// Errors raised by [`ResponseContext`](crate::ResponseContext) operations.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("bad arguments: {reason}")]
    BadArguments { reason: String },

    #[error("status must be between 300 and 399 inclusive, got {code}")]
    BadStatusRange { code: u16 },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },
}

impl ResponseError {
    pub fn bad_arguments<S: ToString>(reason: S) -> Self {
        Self::BadArguments { reason: reason.to_string() }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }
}

/// Errors that stop a request before the middleware chain starts.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid request url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid host header '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}

impl DispatchError {
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl { url: url.into(), source }
    }

    pub fn invalid_host(host: impl Into<String>, source: http::uri::InvalidUri) -> Self {
        Self::InvalidHost { host: host.into(), source }
    }
}
