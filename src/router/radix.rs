//! Radix tree over path segments.
//!
//! - Each node represents a path segment
//! - Static segments (e.g., `users`) match exactly and win over placeholders
//! - Placeholder segments (e.g., `:id`) match any single segment
//! - Values are stored at terminal nodes, keyed by HTTP method
//!
//! Lookup is O(k) in the number of segments, with backtracking when a static
//! branch dead-ends and a placeholder sibling could still match.

use super::PathParams;
use http::Method;
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Clone)]
pub(crate) struct RadixNode<T> {
    /// The path segment this node represents (without leading /)
    segment: Cow<'static, str>,
    routes: HashMap<Method, T>,
    /// Placeholder name for `:name` nodes
    param_name: Option<Cow<'static, str>>,
    children: Vec<RadixNode<T>>,
    /// Placeholder children; differently named placeholders at the same depth
    /// are kept apart so each route extracts its own names.
    param_children: Vec<RadixNode<T>>,
}

impl<T> RadixNode<T> {
    pub(crate) fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            routes: HashMap::new(),
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn new_param(param_name: Cow<'static, str>) -> Self {
        Self {
            segment: Cow::Borrowed(""),
            routes: HashMap::new(),
            param_name: Some(param_name),
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Insert a value, returning the one it replaces.
    pub(crate) fn insert(&mut self, segments: &[&str], method: Method, value: T) -> Option<T> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.insert(method, value);
        };

        if let Some(param_name) = segment.strip_prefix(':') {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(param_name))
            {
                return child.insert(remaining, method, value);
            }
            let mut child = RadixNode::new_param(Cow::Owned(param_name.to_string()));
            let replaced = child.insert(remaining, method, value);
            self.param_children.push(child);
            return replaced;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            return child.insert(remaining, method, value);
        }
        let mut child = RadixNode::new(Cow::Owned(segment.to_string()));
        let replaced = child.insert(remaining, method, value);
        self.children.push(child);
        replaced
    }

    /// Find the terminal node for `segments`, recording placeholder values.
    ///
    /// `accept` decides whether a terminal node counts as a match, so the same
    /// walk serves both method lookup and the 405 check.
    pub(crate) fn search<'a>(
        &'a self,
        segments: &[&str],
        params: &mut PathParams,
        accept: &dyn Fn(&RadixNode<T>) -> bool,
    ) -> Option<&'a RadixNode<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return accept(self).then_some(self);
        };

        for child in self.children.iter().filter(|c| c.segment == *segment) {
            if let Some(found) = child.search(remaining, params, accept) {
                return Some(found);
            }
        }

        for child in &self.param_children {
            let Some(name) = &child.param_name else {
                continue;
            };
            params.push((name.to_string(), decode_segment(segment)));
            if let Some(found) = child.search(remaining, params, accept) {
                return Some(found);
            }
            params.pop();
        }
        None
    }

    pub(crate) fn get(&self, method: &Method) -> Option<&T> {
        self.routes.get(method)
    }

    pub(crate) fn has(&self, method: &Method) -> bool {
        self.routes.contains_key(method)
    }

    pub(crate) fn is_terminal(&self) -> bool {
        !self.routes.is_empty()
    }

    pub(crate) fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.routes.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

/// Percent-decode one path segment; malformed escapes are kept verbatim.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string())
}

pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(routes: &[(Method, &str, &'static str)]) -> RadixNode<&'static str> {
        let mut root = RadixNode::new(Cow::Borrowed(""));
        for (method, path, name) in routes {
            root.insert(&split_path(path), method.clone(), *name);
        }
        root
    }

    fn find(
        root: &RadixNode<&'static str>,
        method: Method,
        path: &str,
    ) -> Option<(&'static str, PathParams)> {
        let mut params = PathParams::new();
        let node = root.search(&split_path(path), &mut params, &|n| n.has(&method))?;
        node.get(&method).map(|v| (*v, params))
    }

    #[test]
    fn test_static_wins_over_placeholder() {
        let root = tree(&[
            (Method::GET, "/users/:id", "get_user"),
            (Method::GET, "/users/me", "me"),
        ]);
        assert_eq!(find(&root, Method::GET, "/users/me").unwrap().0, "me");
        let (name, params) = find(&root, Method::GET, "/users/42").unwrap();
        assert_eq!(name, "get_user");
        assert_eq!(params.as_slice(), &[("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn test_different_param_names_same_position() {
        let root = tree(&[
            (Method::GET, "/users/:user_id/posts", "posts"),
            (Method::GET, "/users/:id/comments", "comments"),
        ]);
        let (_, params) = find(&root, Method::GET, "/users/1/posts").unwrap();
        assert_eq!(params[0].0, "user_id");
        let (_, params) = find(&root, Method::GET, "/users/2/comments").unwrap();
        assert_eq!(params[0].0, "id");
    }

    #[test]
    fn test_backtracks_into_placeholder() {
        let root = tree(&[
            (Method::GET, "/files/static/raw", "raw"),
            (Method::GET, "/files/:name/meta", "meta"),
        ]);
        let (name, params) = find(&root, Method::GET, "/files/static/meta").unwrap();
        assert_eq!(name, "meta");
        assert_eq!(params[0].1, "static");
    }

    #[test]
    fn test_percent_decoding() {
        let root = tree(&[(Method::GET, "/tags/:tag", "tag")]);
        let (_, params) = find(&root, Method::GET, "/tags/hello%20world").unwrap();
        assert_eq!(params[0].1, "hello world");
        let (_, params) = find(&root, Method::GET, "/tags/%zz").unwrap();
        assert_eq!(params[0].1, "%zz");
    }

    #[test]
    fn test_replaced_value_is_returned() {
        let mut root = tree(&[(Method::GET, "/a", "first")]);
        assert_eq!(root.insert(&split_path("/a"), Method::GET, "second"), Some("first"));
    }
}
