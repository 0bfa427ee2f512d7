//! Router core: registration and the request-time lookup.

use super::radix::{split_path, RadixNode};
use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Maximum number of path parameters stored inline before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 4;

/// Percent-decoded `(name, value)` pairs in path order.
pub type PathParams = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Outcome of a lookup.
#[derive(Debug)]
pub enum RouteMatch<'a, T> {
    Found { value: &'a T, params: PathParams },
    /// The path exists but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Method + path template → value.
///
/// Templates use `:name` placeholders; OpenAPI `{name}` templates are
/// converted with [`to_placeholder_syntax`].
#[derive(Clone)]
pub struct PathRouter<T> {
    root: RadixNode<T>,
    len: usize,
}

impl<T> Default for PathRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathRouter<T> {
    pub fn new() -> Self {
        Self {
            root: RadixNode::new(Cow::Borrowed("")),
            len: 0,
        }
    }

    /// Register `value`, returning the value previously stored for the same
    /// method and template.
    pub fn insert(&mut self, method: Method, template: &str, value: T) -> Option<T> {
        let replaced = self.root.insert(&split_path(template), method, value);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    pub fn lookup(&self, method: &Method, path: &str) -> RouteMatch<'_, T> {
        let segments = split_path(path);
        let mut params = PathParams::new();
        if let Some(node) = self.root.search(&segments, &mut params, &|n| n.has(method)) {
            if let Some(value) = node.get(method) {
                return RouteMatch::Found { value, params };
            }
        }

        params.clear();
        match self.root.search(&segments, &mut params, &RadixNode::is_terminal) {
            Some(node) => RouteMatch::MethodNotAllowed {
                allowed: node.methods(),
            },
            None => RouteMatch::NotFound,
        }
    }

    /// Number of registered `(method, template)` pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// First segment that mixes a `{placeholder}` with literal text, such as
/// `{name}.json`. Only whole-segment placeholders can be routed.
pub fn partial_placeholder(template: &str) -> Option<&str> {
    template.split('/').find(|segment| {
        let whole = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .is_some_and(|name| !name.is_empty() && !name.contains(['{', '}']));
        !whole && segment.contains(['{', '}'])
    })
}

/// Convert `/pets/{petId}` into `/pets/:petId`.
pub fn to_placeholder_syntax(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Cow::Owned(format!(":{name}")),
            None => Cow::Borrowed(segment),
        })
        .collect::<Vec<_>>()
        .join("/")
}
