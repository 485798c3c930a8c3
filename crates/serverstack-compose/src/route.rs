//! HTTP route table.
//!
//! Path templates are parsed with `nom` into literal and `{param}` segments.
//! Two templates are the same route when their normalized forms match, which
//! ignores parameter names: `/notes/{id}` and `/notes/{other}` collide.

use std::collections::HashSet;
use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    multi::many0,
    sequence::{delimited, preceded},
};
use serverstack_common::error::{Result, ServerstackError};
use serverstack_common::types::{AuthorizerMode, HandlerRef, HttpMethod};

use crate::resource::ResourceRef;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Matched verbatim.
    Literal(String),
    /// `{name}`, or `{name+}` when `greedy` (matches the rest of the path).
    Param {
        /// Parameter identifier.
        name: String,
        /// Whether the parameter swallows the remaining segments.
        greedy: bool,
    },
}

/// A validated path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<PathSegment>,
}

enum RawSegment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

fn is_literal_char(c: char) -> bool {
    !matches!(c, '/' | '{' | '}') && !c.is_whitespace() && !c.is_control()
}

fn literal(input: &str) -> IResult<&str, RawSegment<'_>> {
    let (input, text) = take_while1(is_literal_char)(input)?;
    Ok((input, RawSegment::Literal(text)))
}

fn parameter(input: &str) -> IResult<&str, RawSegment<'_>> {
    let (input, inner) = delimited(
        char('{'),
        take_while(|c: char| !matches!(c, '{' | '}' | '/')),
        char('}'),
    )
    .parse(input)?;
    Ok((input, RawSegment::Param(inner)))
}

fn raw_segments(input: &str) -> IResult<&str, Vec<RawSegment<'_>>> {
    many0(preceded(char('/'), alt((parameter, literal)))).parse(input)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PathTemplate {
    /// Parses and validates a template such as `/notes/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::InvalidPath` when the template does not start
    /// with `/`, has an empty segment, or a parameter that is empty, not an
    /// identifier, repeated, or greedy before the last segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| ServerstackError::InvalidPath {
            path: raw.to_string(),
            reason,
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'".into()));
        }
        if raw == "/" {
            return Ok(Self {
                raw: raw.to_string(),
                segments: Vec::new(),
            });
        }

        let (rest, raw_segments) =
            raw_segments(raw).map_err(|e| invalid(format!("unparseable template: {e}")))?;
        if !rest.is_empty() {
            // many0 backtracks to the '/' preceding the segment it could not parse
            let mut chars = rest.chars();
            let first = chars.next();
            let offending = if first == Some('/') { chars.next() } else { first };
            let reason = match offending {
                None | Some('/') => "empty path segment".to_string(),
                Some('{') => "malformed parameter segment".to_string(),
                Some('}') => "unbalanced '}'".to_string(),
                Some(other) => format!("unexpected character {other:?}"),
            };
            return Err(invalid(reason));
        }

        let count = raw_segments.len();
        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(count);
        for (idx, segment) in raw_segments.into_iter().enumerate() {
            match segment {
                RawSegment::Literal(text) => segments.push(PathSegment::Literal(text.into())),
                RawSegment::Param(inner) => {
                    let (name, greedy) = inner
                        .strip_suffix('+')
                        .map_or((inner, false), |name| (name, true));
                    if name.is_empty() {
                        return Err(invalid("empty parameter name".into()));
                    }
                    if !is_identifier(name) {
                        return Err(invalid(format!(
                            "parameter \"{name}\" is not a valid identifier"
                        )));
                    }
                    if greedy && idx + 1 != count {
                        return Err(invalid(format!(
                            "greedy parameter \"{name}\" must be the last segment"
                        )));
                    }
                    if !seen.insert(name) {
                        return Err(invalid(format!("duplicate parameter \"{name}\"")));
                    }
                    segments.push(PathSegment::Param {
                        name: name.into(),
                        greedy,
                    });
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Parameter names in order of appearance.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Param { name, .. } => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }

    /// Template with parameter names erased, e.g. `/notes/{}`.
    #[must_use]
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".into();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Literal(text) => out.push_str(text),
                PathSegment::Param { greedy: false, .. } => out.push_str("{}"),
                PathSegment::Param { greedy: true, .. } => out.push_str("{+}"),
            }
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Defaults captured when a [`RouteTable`] is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDefaults {
    /// Authorizer of routes that do not override it.
    pub authorizer: AuthorizerMode,
    /// Resources bound to every route.
    pub bound_resources: Vec<ResourceRef>,
}

impl RouteDefaults {
    /// Empty defaults: no authorizer, no bound resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default authorizer.
    #[must_use]
    pub fn authorizer(mut self, authorizer: AuthorizerMode) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Adds a resource bound to every route.
    #[must_use]
    pub fn bind(mut self, resource: impl Into<ResourceRef>) -> Self {
        push_unique(&mut self.bound_resources, resource.into());
        self
    }
}

/// Per-route overrides of the table defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Replaces the default authorizer when set.
    pub authorizer: Option<AuthorizerMode>,
    /// Resources bound in addition to the defaults.
    pub bound_resources: Vec<ResourceRef>,
}

impl RouteOptions {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the authorizer for this route.
    #[must_use]
    pub fn authorizer(mut self, authorizer: AuthorizerMode) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Binds an extra resource to this route.
    #[must_use]
    pub fn bind(mut self, resource: impl Into<ResourceRef>) -> Self {
        push_unique(&mut self.bound_resources, resource.into());
        self
    }
}

fn push_unique(list: &mut Vec<ResourceRef>, resource: ResourceRef) {
    if !list.contains(&resource) {
        list.push(resource);
    }
}

/// A registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: HttpMethod,
    path: PathTemplate,
    handler: HandlerRef,
    authorizer: AuthorizerMode,
    bound_resources: Vec<ResourceRef>,
    additional_resources: Vec<ResourceRef>,
}

impl Route {
    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path template.
    #[must_use]
    pub const fn path(&self) -> &PathTemplate {
        &self.path
    }

    /// Handler reference.
    #[must_use]
    pub const fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Effective authorizer.
    #[must_use]
    pub const fn authorizer(&self) -> &AuthorizerMode {
        &self.authorizer
    }

    /// Table defaults followed by route-specific additions.
    #[must_use]
    pub fn bound_resources(&self) -> &[ResourceRef] {
        &self.bound_resources
    }

    /// Route-specific additions not already among the defaults.
    #[must_use]
    pub fn additional_resources(&self) -> &[ResourceRef] {
        &self.additional_resources
    }

    /// `METHOD /template` as written.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Ordered, duplicate-free route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    defaults: RouteDefaults,
    routes: Vec<Route>,
    keys: HashSet<(HttpMethod, String)>,
}

impl RouteTable {
    /// Creates an empty table with the given defaults.
    #[must_use]
    pub fn new(defaults: RouteDefaults) -> Self {
        Self {
            defaults,
            routes: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Registers a route.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::InvalidPath` for a malformed template and
    /// `ServerstackError::DuplicateRoute` when (method, normalized template)
    /// is already registered.
    pub fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: impl Into<HandlerRef>,
        options: RouteOptions,
    ) -> Result<&Route> {
        let path = PathTemplate::parse(path)?;
        let normalized = path.normalized();
        if self.keys.contains(&(method, normalized.clone())) {
            return Err(ServerstackError::DuplicateRoute {
                method: method.to_string(),
                path: normalized,
            });
        }

        let mut bound_resources = self.defaults.bound_resources.clone();
        let mut additional_resources = Vec::new();
        for resource in options.bound_resources {
            if !bound_resources.contains(&resource) {
                bound_resources.push(resource.clone());
                additional_resources.push(resource);
            }
        }

        let route = Route {
            method,
            path,
            handler: handler.into(),
            authorizer: options
                .authorizer
                .unwrap_or_else(|| self.defaults.authorizer.clone()),
            bound_resources,
            additional_resources,
        };
        tracing::debug!(route = %route.key(), handler = %route.handler, "registered route");
        let _ = self.keys.insert((method, normalized));
        self.routes.push(route);
        Ok(&self.routes[self.routes.len() - 1])
    }

    /// Registers a route from a `"METHOD /path"` key.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Config` for a malformed key or unknown
    /// method, otherwise the errors of [`RouteTable::add_route`].
    pub fn add(
        &mut self,
        key: &str,
        handler: impl Into<HandlerRef>,
        options: RouteOptions,
    ) -> Result<&Route> {
        let mut parts = key.split_whitespace();
        let (Some(method), Some(path), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ServerstackError::Config {
                message: format!("route key \"{key}\" must have the form \"METHOD /path\""),
            });
        };
        let method: HttpMethod = method.parse()?;
        self.add_route(method, path, handler, options)
    }

    /// Looks up a route by method and any equivalent template.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::InvalidPath` if `path` is malformed.
    pub fn get(&self, method: HttpMethod, path: &str) -> Result<Option<&Route>> {
        let normalized = PathTemplate::parse(path)?.normalized();
        Ok(self
            .routes
            .iter()
            .find(|r| r.method == method && r.path.normalized() == normalized))
    }

    /// Defaults captured at construction.
    #[must_use]
    pub const fn defaults(&self) -> &RouteDefaults {
        &self.defaults
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
