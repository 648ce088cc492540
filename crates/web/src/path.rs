//! Route path templates.
//!
//! A template is a `/`-separated list of segments, each either a literal or a named
//! parameter:
//!
//! - `/api/courses` only literals
//! - `/api/courses/:id` a required parameter, matching one non-empty segment
//! - `/api/courses/:id?` an optional parameter; it takes its leading `/` with it, so
//!   both `/api/courses` and `/api/courses/42` match
//!
//! Templates are compiled once into a [`PathMatcher`]. Matching ignores ASCII case
//! and tolerates a single trailing `/`.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::RouteError;
use crate::request::PathParams;

/// Pattern one parameter captures: a non-empty run of anything but a separator.
const PARAM_PATTERN: &str = "([^/#?]+?)";

/// A compiled path template.
#[derive(Clone)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathMatcher {
    /// Compiles `template`.
    ///
    /// Fails with [`RouteError::InvalidTemplate`] when a parameter name is empty, uses
    /// characters outside `[A-Za-z0-9_]`, or is declared twice.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut names: Vec<String> = Vec::new();

        for segment in template.split('/').filter(|segment| !segment.is_empty()) {
            let Some(param) = segment.strip_prefix(':') else {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
                continue;
            };

            let (name, optional) = match param.strip_suffix('?') {
                Some(name) => (name, true),
                None => (param, false),
            };

            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                return Err(RouteError::invalid_template(template, format!("bad parameter name '{name}'")));
            }
            if names.iter().any(|declared| declared == name) {
                return Err(RouteError::invalid_template(template, format!("parameter '{name}' declared twice")));
            }

            if optional {
                pattern.push_str("(?:/");
                pattern.push_str(PARAM_PATTERN);
                pattern.push_str(")?");
            } else {
                pattern.push('/');
                pattern.push_str(PARAM_PATTERN);
            }
            names.push(name.to_owned());
        }

        pattern.push_str("/?$");

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RouteError::invalid_template(template, e))?;

        Ok(Self { template: template.to_owned(), regex, names })
    }

    /// The template string exactly as registered.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Declared parameter names, in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn test(&self, path: &str) -> bool {
        self.regex.is_match(normalize_path(path))
    }

    /// Extracts every declared parameter from `path`, `None` when `path` does not match.
    ///
    /// Optional parameters missing from `path` are present with an absent value.
    /// Values are returned raw, without percent-decoding.
    pub fn extract(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(normalize_path(path))?;

        let params = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), captures.get(index + 1).map(|value| value.as_str().to_owned())))
            .collect();

        Some(params)
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher").field("template", &self.template).field("names", &self.names).finish()
    }
}

/// Strips one trailing `/`, leaving the root path untouched.
pub fn normalize_path(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> PathMatcher {
        PathMatcher::compile(template).unwrap()
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("/a/"), "/a");
        assert_eq!(normalize_path("/a/b"), "/a/b");
    }

    #[test]
    fn literal_match() {
        let matcher = compile("/api/courses");

        assert!(matcher.test("/api/courses"));
        assert!(matcher.test("/api/courses/"));
        assert!(matcher.test("/API/Courses"));
        assert!(!matcher.test("/api"));
        assert!(!matcher.test("/api/courses/1"));
        assert!(!matcher.test("/api/coursesx"));
    }

    #[test]
    fn root_match() {
        let matcher = compile("/");

        assert!(matcher.test("/"));
        assert!(!matcher.test("/index"));
        assert_eq!(matcher.param_names().count(), 0);
    }

    #[test]
    fn literal_is_not_a_pattern() {
        let matcher = compile("/files/a.b");

        assert!(matcher.test("/files/a.b"));
        assert!(!matcher.test("/files/aXb"));
    }

    #[test]
    fn required_param() {
        let matcher = compile("/users/:id");

        assert!(!matcher.test("/users"));
        assert!(!matcher.test("/users/"));
        assert!(!matcher.test("/users/1/posts"));

        let params = matcher.extract("/users/42/").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn optional_trailing_param() {
        let matcher = compile("/a/:x/:y?");

        let params = matcher.extract("/a/1").unwrap();
        assert_eq!(params.get("x"), Some("1"));
        assert_eq!(params.get("y"), None);
        assert!(params.contains_key("y"));
        assert_eq!(params.len(), 2);

        let params = matcher.extract("/a/1/2").unwrap();
        assert_eq!(params.get("x"), Some("1"));
        assert_eq!(params.get("y"), Some("2"));

        assert!(matcher.extract("/a").is_none());
        assert!(matcher.extract("/a/1/2/3").is_none());
    }

    #[test]
    fn optional_param_in_the_middle() {
        let matcher = compile("/shop/:category?/items");

        assert_eq!(matcher.extract("/shop/items").unwrap().get("category"), None);
        assert_eq!(matcher.extract("/shop/books/items").unwrap().get("category"), Some("books"));
    }

    #[test]
    fn values_are_raw() {
        let matcher = compile("/search/:term");

        let params = matcher.extract("/search/hello%20world").unwrap();
        assert_eq!(params.get("term"), Some("hello%20world"));
    }

    #[test]
    fn names_keep_template_order() {
        let matcher = compile("/:b/:a/:c?");

        assert_eq!(matcher.param_names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(matcher.template(), "/:b/:a/:c?");
    }

    #[test]
    fn invalid_templates() {
        for template in ["/users/:", "/users/:?", "/users/:id-x", "/users/:id/:id"] {
            let result = PathMatcher::compile(template);
            assert!(matches!(result, Err(RouteError::InvalidTemplate { .. })), "{template} should be rejected");
        }
    }
}
