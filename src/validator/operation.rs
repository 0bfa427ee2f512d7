//! Per-operation validation of a handler chain against its specification
//! operation.
//!
//! Every handler in the chain (middlewares first, then the terminal handler)
//! is checked for what it declares: a body type needs a request body, each
//! bound parameter must exist with a compatible schema, and each envelope
//! status must be a declared response with compatible payload schemas. The
//! chain as a whole is then checked for coverage of the operation's path
//! parameters, query parameters and responses.

use super::schema::SchemaValidator;
use crate::config::OperationValidation;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use crate::shape::{HandlerResponses, ParamLocation, StatusTagProblem};
use crate::spec::{ParameterLocation, SpecOperation, Specification};
use crate::typed::Handler;
use std::collections::BTreeSet;
use std::panic::Location;
use std::sync::Arc;
use tracing::debug;

impl From<ParamLocation> for ParameterLocation {
    fn from(location: ParamLocation) -> Self {
        match location {
            ParamLocation::Path => ParameterLocation::Path,
            ParamLocation::Query => ParameterLocation::Query,
        }
    }
}

/// Validate one operation's chain. Returns `false` iff an error was reported
/// for this operation.
pub fn validate_operation(
    spec: &Specification,
    id: &str,
    chain: &[Arc<dyn Handler>],
    policy: &OperationValidation,
    sink: &mut Diagnostics,
) -> bool {
    let errors_before = sink.errors();
    let Some(op) = spec.operation(id) else {
        sink.report(
            Diagnostic::new(
                Severity::Error,
                DiagnosticKind::UnknownOperation,
                format!("operation '{id}' is not declared by the specification"),
            )
            .operation(id),
        );
        return false;
    };

    let mut checker = ChainChecker {
        op,
        id,
        policy,
        sink: &mut *sink,
        handles_body: false,
        path_params: BTreeSet::new(),
        query_params: BTreeSet::new(),
        statuses: BTreeSet::new(),
    };
    for handler in chain {
        checker.check_handler(handler.as_ref());
    }
    checker.check_coverage();

    let ok = sink.errors() == errors_before;
    debug!(operation = id, route = %op.label(), handlers = chain.len(), ok, "validated operation");
    ok
}

struct ChainChecker<'a, 'd> {
    op: &'a SpecOperation,
    id: &'a str,
    policy: &'a OperationValidation,
    sink: &'d mut Diagnostics,
    handles_body: bool,
    path_params: BTreeSet<String>,
    query_params: BTreeSet<String>,
    statuses: BTreeSet<u16>,
}

impl ChainChecker<'_, '_> {
    fn report(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        location: &str,
        subject: impl Into<String>,
        source: Option<&'static Location<'static>>,
        message: String,
    ) {
        self.sink.report(
            Diagnostic::new(severity, kind, message)
                .operation(self.id)
                .location(location)
                .subject(subject)
                .source(source),
        );
    }

    fn validator(
        &mut self,
        severity: Severity,
        context: String,
        source: Option<&'static Location<'static>>,
    ) -> SchemaValidator<'_> {
        SchemaValidator::new(&mut *self.sink, severity)
            .operation(self.id)
            .context(context)
            .source(source)
    }

    fn check_handler(&mut self, handler: &dyn Handler) {
        let op = self.op;
        let source = handler.location();
        let types = handler.request_types();

        if !types.body.is_nil() {
            self.handles_body = true;
            let severity = self.policy.validate_request_body;
            match &op.operation.request_body {
                None => self.report(
                    severity,
                    DiagnosticKind::MissingRequestBody,
                    "requestBody",
                    types.body.to_string(),
                    source,
                    format!(
                        "handler declares body type {} but {} has no request body",
                        types.body,
                        op.label()
                    ),
                ),
                Some(body) => {
                    for (mime, media) in &body.content {
                        if let Some(schema) = &media.schema {
                            self.validator(severity, format!("request body {mime}"), source)
                                .check(&types.body, schema);
                        }
                    }
                }
            }
        }

        for location in [ParamLocation::Path, ParamLocation::Query] {
            let severity = match location {
                ParamLocation::Path => self.policy.validate_path_params,
                ParamLocation::Query => self.policy.validate_query_params,
            };
            for field in types.param_fields(location) {
                match location {
                    ParamLocation::Path => self.path_params.insert(field.name.clone()),
                    ParamLocation::Query => self.query_params.insert(field.name.clone()),
                };
                match op.operation.parameter(&field.name, location.into()) {
                    None => self.report(
                        severity,
                        DiagnosticKind::UnknownParameter,
                        &format!("parameters/{location}/{}", field.name),
                        field.ident,
                        source,
                        format!(
                            "handler binds {location} parameter '{}' (field {}) which {} does not declare",
                            field.name,
                            field.ident,
                            op.label()
                        ),
                    ),
                    Some(param) => {
                        if let Some(schema) = &param.schema {
                            self.validator(
                                severity,
                                format!("{location} parameter '{}'", field.name),
                                source,
                            )
                            .check(&field.shape, schema);
                        }
                    }
                }
            }
        }

        let responses = HandlerResponses::from_shape(&handler.response_shape());
        let envelope = responses.envelope.unwrap_or("Nil");
        for problem in &responses.problems {
            let kind = match problem {
                StatusTagProblem::Invalid { .. } => DiagnosticKind::InvalidStatusTag,
                StatusTagProblem::Duplicate { .. } => DiagnosticKind::DuplicateStatusTag,
                StatusTagProblem::Missing { .. } => DiagnosticKind::MissingStatusTag,
            };
            self.report(
                Severity::Error,
                kind,
                "responses",
                envelope,
                source,
                format!("{envelope}: {problem}"),
            );
        }

        let severity = self.policy.validate_responses;
        for arm in responses.arms.values() {
            self.statuses.insert(arm.status);
            let Some(response) = op.operation.responses.get(&arm.status) else {
                self.report(
                    severity,
                    DiagnosticKind::UnknownResponse,
                    &format!("responses/{}", arm.status),
                    format!("{envelope}::{}", arm.variant),
                    source,
                    format!(
                        "{envelope}::{} produces status {} which {} does not declare",
                        arm.variant,
                        arm.status,
                        op.label()
                    ),
                );
                continue;
            };
            if arm.is_nil() {
                continue;
            }
            for (mime, media) in &response.content {
                if let Some(schema) = &media.schema {
                    self.validator(severity, format!("response {} {mime}", arm.status), source)
                        .check(&arm.shape, schema);
                }
            }
        }
    }

    fn check_coverage(&mut self) {
        let op = self.op;
        let label = op.label();

        if op.operation.request_body.is_some() && !self.handles_body {
            self.report(
                self.policy.validate_request_body,
                DiagnosticKind::UnhandledRequestBody,
                "requestBody",
                label.clone(),
                None,
                format!("{label} declares a request body but no handler in the chain binds one"),
            );
        }

        for (location, severity) in [
            (ParameterLocation::Path, self.policy.handle_all_path_params),
            (ParameterLocation::Query, self.policy.handle_all_query_params),
        ] {
            let handled = match location {
                ParameterLocation::Path => &self.path_params,
                _ => &self.query_params,
            };
            let missing: Vec<String> = op
                .operation
                .parameters_in(location)
                .filter(|p| !handled.contains(&p.name))
                .map(|p| p.name.clone())
                .collect();
            for name in missing {
                self.report(
                    severity,
                    DiagnosticKind::UnhandledParameter,
                    &format!("parameters/{location}/{name}"),
                    name.clone(),
                    None,
                    format!("{location} parameter '{name}' of {label} is not bound by any handler"),
                );
            }
        }

        let missing: Vec<u16> = op
            .operation
            .responses
            .keys()
            .copied()
            .filter(|s| !self.statuses.contains(s))
            .collect();
        for status in missing {
            self.report(
                self.policy.handle_all_responses,
                DiagnosticKind::UnhandledResponse,
                &format!("responses/{status}"),
                status.to_string(),
                None,
                format!("response {status} of {label} is not produced by any handler"),
            );
        }
    }
}
