//! # Builder Module
//!
//! Assembles handler chains, validates them against the specification and
//! compiles them into an [`OasRouter`].
//!
//! ## Build pass
//!
//! [`RouterBuilder::build`] runs one complete validation pass before failing,
//! so a single [`BuildError`] lists every problem at once:
//!
//! 1. Groups are flattened; each operation's chain is the enclosing groups'
//!    middlewares (outermost first), the operation's own middlewares, then its
//!    terminal handler.
//! 2. Duplicate registrations of an operation id are errors.
//! 3. Every media type declared by a non-excluded operation needs a registered
//!    codec (`handle_all_content_types`).
//! 4. Every non-excluded operation needs a handler (`must_handle_all_operations`).
//! 5. Each chain is checked by [`crate::validator::validate_operation`] under
//!    the operation's effective policy.
//!
//! Only when no error was reported are the chains compiled (right fold, each
//! dispatcher capturing the next) and registered under their method and path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use oasrouter::{handler, RouterBuilder};
//!
//! let router = RouterBuilder::new(spec)
//!     .use_middleware(oasrouter::middleware::error_handler())
//!     .with_operation("greet", handler(greet), vec![])
//!     .build()?;
//! ```

mod group;

pub use group::Group;

use crate::codec::{Codec, Codecs};
use crate::config::RouterOptions;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use crate::dispatcher::{Dispatch, OasRouter, Route};
use crate::errors::BuildError;
use crate::router::{partial_placeholder, to_placeholder_syntax, PathRouter};
use crate::spec::Specification;
use crate::typed::{CompileContext, Handler};
use crate::validator::validate_operation;
use group::{FlatOperation, OperationEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects codecs, options and handlers for one router.
pub struct RouterBuilder {
    spec: Specification,
    codecs: Codecs,
    options: RouterOptions,
    root: Group,
}

impl RouterBuilder {
    pub fn new(spec: Specification) -> Self {
        Self {
            spec,
            codecs: Codecs::default(),
            options: RouterOptions::default(),
            root: Group::new(),
        }
    }

    /// Register a codec, replacing any codec for the same media type.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.register(codec);
        self
    }

    pub fn with_options(mut self, options: RouterOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a middleware applied to every operation.
    pub fn use_middleware(mut self, middleware: Arc<dyn Handler>) -> Self {
        self.root.push_middleware(middleware);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.root.push_group(group);
        self
    }

    /// Register the terminal handler of operation `id`, preceded by `middlewares`.
    pub fn with_operation(
        mut self,
        id: impl Into<String>,
        terminal: Arc<dyn Handler>,
        middlewares: Vec<Arc<dyn Handler>>,
    ) -> Self {
        self.root.push_operation(OperationEntry {
            id: id.into(),
            middlewares,
            terminal,
        });
        self
    }

    pub fn build(self) -> Result<OasRouter, BuildError> {
        let mut sink = Diagnostics::new(self.options.log_level);
        let flat = self.root.flatten();
        let accepted = self.accept_registrations(&flat, &mut sink);
        self.check_codecs(&mut sink);
        self.check_handled(&accepted, &mut sink);
        self.check_templates(&accepted, &mut sink);

        for op in &accepted {
            let policy = self.options.validation_for(&op.id);
            validate_operation(&self.spec, &op.id, &op.chain, &policy, &mut sink);
        }

        let diagnostics = sink.must_have_no_errors()?;
        let mut routes = PathRouter::new();
        for op in &accepted {
            let Some(spec_op) = self.spec.operation(&op.id) else {
                continue;
            };
            let ctx = CompileContext {
                operation: spec_op,
                codecs: &self.codecs,
            };
            let mut next: Option<Arc<dyn Dispatch>> = None;
            for handler in op.chain.iter().rev() {
                next = Some(handler.compile(&ctx, next));
            }
            let Some(chain) = next else {
                continue;
            };
            let template = to_placeholder_syntax(&spec_op.path);
            let route = Route {
                operation: Arc::new(spec_op.clone()),
                chain,
            };
            if routes
                .insert(spec_op.method.clone(), &template, route)
                .is_some()
            {
                warn!(operation = %op.id, route = %spec_op.label(), "route registered twice, keeping the last");
            }
            debug!(operation = %op.id, route = %spec_op.label(), handlers = op.chain.len(), "registered route");
        }

        info!(
            routes = routes.len(),
            warnings = diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Warn)
                .count(),
            "router built"
        );
        Ok(OasRouter::new(routes, self.options.recover_on_panic))
    }

    /// Drop excluded registrations and report duplicates. The first
    /// registration of an id is the one validated.
    fn accept_registrations<'f>(
        &self,
        flat: &'f [FlatOperation],
        sink: &mut Diagnostics,
    ) -> Vec<&'f FlatOperation> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for op in flat {
            *counts.entry(op.id.as_str()).or_default() += 1;
        }

        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        for op in flat {
            if self.options.is_excluded(&op.id) {
                debug!(operation = %op.id, "operation excluded, skipping handler");
                continue;
            }
            if !seen.insert(op.id.as_str()) {
                continue;
            }
            let count = counts.get(op.id.as_str()).copied().unwrap_or(1);
            if count > 1 {
                sink.report(
                    Diagnostic::new(
                        Severity::Error,
                        DiagnosticKind::DuplicateOperation,
                        format!("operation '{}' has {count} handlers registered", op.id),
                    )
                    .operation(&op.id),
                );
            }
            accepted.push(op);
        }
        accepted
    }

    fn check_codecs(&self, sink: &mut Diagnostics) {
        let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for op in self.spec.operations() {
            if op.id().is_some_and(|id| self.options.is_excluded(id)) {
                continue;
            }
            for mime in self.spec.content_types(op) {
                if !self.codecs.contains(&mime) {
                    missing.entry(mime).or_default().push(op.label());
                }
            }
        }
        for (mime, routes) in missing {
            sink.report(
                Diagnostic::new(
                    self.options.handle_all_content_types,
                    DiagnosticKind::MissingCodec,
                    format!(
                        "no codec registered for content type '{mime}' used by {}",
                        routes.join(", ")
                    ),
                )
                .subject(mime),
            );
        }
    }

    /// Paths the router cannot match are errors for every handled operation.
    fn check_templates(&self, accepted: &[&FlatOperation], sink: &mut Diagnostics) {
        for op in accepted {
            let Some(spec_op) = self.spec.operation(&op.id) else {
                continue;
            };
            if let Some(segment) = partial_placeholder(&spec_op.path) {
                sink.report(
                    Diagnostic::new(
                        Severity::Error,
                        DiagnosticKind::UnsupportedPathTemplate,
                        format!(
                            "path segment '{segment}' mixes a placeholder with literal text; only whole-segment placeholders are routed"
                        ),
                    )
                    .operation(&op.id)
                    .location(spec_op.label())
                    .subject(segment),
                );
            }
        }
    }

    fn check_handled(&self, accepted: &[&FlatOperation], sink: &mut Diagnostics) {
        let handled: HashSet<&str> = accepted.iter().map(|op| op.id.as_str()).collect();
        for op in self.spec.operations() {
            let diagnostic = match op.id() {
                Some(id) if self.options.is_excluded(id) || handled.contains(id) => continue,
                Some(id) => Diagnostic::new(
                    self.options.must_handle_all_operations,
                    DiagnosticKind::UnhandledOperation,
                    format!("operation '{id}' ({}) has no handler", op.label()),
                )
                .operation(id),
                None => Diagnostic::new(
                    self.options.must_handle_all_operations,
                    DiagnosticKind::UnhandledOperation,
                    format!("{} has no operationId and cannot be handled", op.label()),
                ),
            };
            sink.report(diagnostic.location(op.label()));
        }
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("spec", &self.spec.title())
            .field("options", &self.options)
            .field("root", &self.root)
            .finish()
    }
}
