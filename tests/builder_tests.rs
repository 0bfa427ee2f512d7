mod common;

use common::{send, spec, GREET_SPEC};
use http::StatusCode;
use oasrouter::{
    handler, middleware, ok, BuildError, Context, DiagnosticKind, Envelope, Group, Handler, Nil,
    OperationValidation, Reflect, Request, Response, RouterBuilder, RouterOptions, Severity,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const ABC_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Letters, version: "1.0" }
paths:
  /a:
    get:
      operationId: A
      responses:
        "200": { description: a, content: { text/plain: { schema: { type: string } } } }
  /b:
    get:
      operationId: B
      responses:
        "200": { description: b, content: { text/plain: { schema: { type: string } } } }
  /c:
    get:
      operationId: C
      responses:
        "200": { description: c, content: { text/plain: { schema: { type: string } } } }
"#;

fn letter(text: &'static str) -> Arc<dyn Handler> {
    handler(move |_ctx: &mut Context, _req: Request| Ok(ok(text.to_string())))
}

fn kinds(err: &BuildError) -> Vec<(DiagnosticKind, Option<String>)> {
    err.errors()
        .map(|d| (d.kind, d.operation.clone()))
        .collect()
}

#[test]
fn test_duplicate_and_missing_are_both_reported() {
    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_operation("A", letter("a"), vec![])
        .with_operation("A", letter("again"), vec![])
        .with_operation("B", letter("b"), vec![])
        .build()
        .unwrap_err();

    let found = kinds(&err);
    assert!(found.contains(&(DiagnosticKind::DuplicateOperation, Some("A".into()))));
    assert!(found.contains(&(DiagnosticKind::UnhandledOperation, Some("C".into()))));
    assert_eq!(found.len(), 2);

    let message = err.to_string();
    assert!(message.contains("operation 'A' has 2 handlers registered"));
    assert!(message.contains("operation 'C' (GET /c) has no handler"));
}

#[test]
fn test_duplicate_is_an_error_under_any_policy() {
    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            default_operation_validation: OperationValidation::all(Severity::Off),
            ..Default::default()
        })
        .with_operation("A", letter("a"), vec![])
        .with_operation("A", letter("again"), vec![])
        .build()
        .unwrap_err();
    assert_eq!(
        kinds(&err),
        vec![(DiagnosticKind::DuplicateOperation, Some("A".into()))]
    );
}

#[test]
fn test_unknown_operation_is_never_demoted() {
    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            default_operation_validation: OperationValidation::all(Severity::Off),
            ..Default::default()
        })
        .with_operation("ghost", letter("boo"), vec![])
        .build()
        .unwrap_err();
    assert_eq!(
        kinds(&err),
        vec![(DiagnosticKind::UnknownOperation, Some("ghost".into()))]
    );
}

#[test]
fn test_route_count_skips_excluded_operations() {
    let router = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            exclude_operations: ["C".to_string()].into_iter().collect(),
            ..Default::default()
        })
        .with_operation("A", letter("a"), vec![])
        .with_operation("B", letter("b"), vec![])
        .with_operation("C", letter("c"), vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 2);
    assert_eq!(send(&router, "GET", "/a", None).body(), b"a");
    assert_eq!(send(&router, "GET", "/c", None).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_unhandled_operations_can_be_tolerated() {
    let router = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Warn,
            ..Default::default()
        })
        .with_operation("B", letter("b"), vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 1);
}

fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Handler> {
    let log = Arc::clone(log);
    middleware::<Nil, _>(move |ctx: &mut Context| {
        log.lock().unwrap().push(name);
        ctx.next()?;
        Ok(None)
    })
}

#[test]
fn test_groups_apply_middlewares_outermost_first() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let terminal = {
        let log = Arc::clone(&log);
        handler(move |_ctx: &mut Context, _req: Request| {
            log.lock().unwrap().push("terminal");
            Ok(ok("a".to_string()))
        })
    };

    let inner = Group::new()
        .use_middleware(recorder(&log, "inner"))
        .with_operation("A", terminal, vec![recorder(&log, "own")]);
    let outer = Group::new()
        .use_middleware(recorder(&log, "outer"))
        .with_group(inner)
        .with_operation("B", letter("b"), vec![]);

    let router = RouterBuilder::new(spec(ABC_SPEC))
        .use_middleware(recorder(&log, "root"))
        .with_group(outer)
        .with_operation("C", letter("c"), vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 3);

    send(&router, "GET", "/a", None);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["root", "outer", "inner", "own", "terminal"]
    );

    log.lock().unwrap().clear();
    send(&router, "GET", "/b", None);
    assert_eq!(*log.lock().unwrap(), vec!["root", "outer"]);

    log.lock().unwrap().clear();
    send(&router, "GET", "/c", None);
    assert_eq!(*log.lock().unwrap(), vec!["root"]);
}

#[derive(Debug, Deserialize, Reflect)]
pub struct WrongGreeting {
    pub name: i64,
}

#[derive(Debug, Serialize, Reflect)]
pub struct Reply {
    pub greeting: String,
}

#[derive(Reflect, Envelope)]
pub enum GreetResponse {
    #[oas(status = 200)]
    Ok(Reply),
}

fn wrong_greeter() -> Arc<dyn Handler> {
    handler(|_ctx: &mut Context, req: Request<WrongGreeting>| {
        Ok(Response::send(GreetResponse::Ok(Reply {
            greeting: req.body.name.to_string(),
        })))
    })
}

#[test]
fn test_body_type_mismatch_names_the_property() {
    let err = RouterBuilder::new(spec(GREET_SPEC))
        .with_operation("greet", wrong_greeter(), vec![])
        .build()
        .unwrap_err();

    let errors: Vec<_> = err.errors().collect();
    assert_eq!(errors.len(), 1, "{err}");
    assert_eq!(errors[0].kind, DiagnosticKind::IncompatibleType);
    assert!(errors[0].location.ends_with("#/properties/name"));
    assert!(errors[0].to_string().contains("name"));
    // The diagnostic points at the line that built the handler.
    assert!(errors[0]
        .source
        .is_some_and(|loc| loc.file().ends_with("builder_tests.rs")));
}

#[test]
fn test_body_type_mismatch_can_be_demoted() {
    let mut options = RouterOptions::default();
    options
        .operation_validations
        .entry("greet".to_string())
        .or_default()
        .validate_request_body = Some(Severity::Warn);
    let router = RouterBuilder::new(spec(GREET_SPEC))
        .with_options(options)
        .with_operation("greet", wrong_greeter(), vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 1);
}

#[derive(Reflect, Envelope)]
pub enum BadTag {
    #[oas(status = "20x")]
    Ok(String),
}

#[test]
fn test_invalid_status_tag_fails_the_build() {
    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            ..Default::default()
        })
        .with_operation(
            "A",
            handler(|_ctx: &mut Context, _req: Request| {
                Ok(Response::send(BadTag::Ok("a".into())))
            }),
            vec![],
        )
        .build()
        .unwrap_err();
    let invalid = err
        .errors()
        .find(|d| d.kind == DiagnosticKind::InvalidStatusTag)
        .unwrap();
    assert!(invalid.message.contains("\"20x\""));
}

#[derive(Reflect, Envelope)]
pub enum Teapot {
    #[oas(status = 200)]
    Ok(String),
    #[oas(status = 418)]
    Teapot,
}

#[test]
fn test_undeclared_envelope_status_is_reported() {
    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            ..Default::default()
        })
        .with_operation(
            "A",
            handler(|_ctx: &mut Context, _req: Request| Ok(Response::send(Teapot::Teapot))),
            vec![],
        )
        .build()
        .unwrap_err();
    let unknown: Vec<_> = err.errors().collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].kind, DiagnosticKind::UnknownResponse);
    assert_eq!(unknown[0].location, "responses/418");
}

const PETS_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Pets, version: "1.0" }
paths:
  /pets/{petId}:
    get:
      operationId: getPet
      parameters:
        - { name: petId, in: path, required: true, schema: { type: string, format: uuid } }
        - { name: verbose, in: query, schema: { type: boolean } }
      responses:
        "200": { description: pet, content: { application/json: { schema: { type: string } } } }
"#;

#[derive(Debug, Deserialize, Reflect)]
pub struct PetPath {
    #[oas(path = "petId")]
    pub pet_id: uuid::Uuid,
}

#[derive(Debug, Default, Deserialize, Reflect)]
pub struct PetQuery {
    pub verbose: Option<bool>,
    pub color: Option<String>,
}

#[test]
fn test_parameter_coverage_and_unknown_parameters() {
    let err = RouterBuilder::new(spec(PETS_SPEC))
        .with_operation(
            "getPet",
            handler(|_ctx: &mut Context, _req: Request<Nil, Nil, PetQuery>| {
                Ok(ok("pet".to_string()))
            }),
            vec![],
        )
        .build()
        .unwrap_err();
    let mut found: Vec<(DiagnosticKind, String)> = err
        .errors()
        .map(|d| (d.kind, d.location.clone()))
        .collect();
    found.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        found,
        vec![
            (DiagnosticKind::UnhandledParameter, "parameters/path/petId".to_string()),
            (DiagnosticKind::UnknownParameter, "parameters/query/color".to_string()),
        ]
    );
}

#[test]
fn test_parameters_spread_over_the_chain() {
    // A middleware may bind parameters the terminal handler does not.
    let guard = handler(|_ctx: &mut Context, req: Request<Nil, PetPath>| {
        let _ = req.path.pet_id;
        Ok(ok("pet".to_string()))
    });
    let passthrough = middleware::<Nil, _>(|ctx: &mut Context| {
        ctx.next()?;
        Ok(None)
    });

    #[derive(Debug, Default, Deserialize, Reflect)]
    pub struct Verbose {
        pub verbose: Option<bool>,
    }
    let query_only = handler(|_ctx: &mut Context, _req: Request<Nil, Nil, Verbose>| {
        Ok(ok("pet".to_string()))
    });

    let err = RouterBuilder::new(spec(PETS_SPEC))
        .with_operation("getPet", guard, vec![passthrough])
        .build()
        .unwrap_err();
    assert!(err
        .errors()
        .all(|d| d.location == "parameters/query/verbose"));

    let router = RouterBuilder::new(spec(PETS_SPEC))
        .with_options(RouterOptions {
            default_operation_validation: OperationValidation {
                handle_all_path_params: Severity::Info,
                ..Default::default()
            },
            ..Default::default()
        })
        .with_operation("getPet", query_only, vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 1);
}

#[test]
fn test_body_on_operation_without_request_body() {
    #[derive(Debug, Deserialize, Reflect)]
    pub struct Payload {
        pub value: String,
    }

    let err = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            ..Default::default()
        })
        .with_operation(
            "A",
            handler(|_ctx: &mut Context, req: Request<Payload>| Ok(ok(req.body.value))),
            vec![],
        )
        .build()
        .unwrap_err();
    let errors: Vec<_> = err.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::MissingRequestBody);
}

#[test]
fn test_unbound_request_body_is_reported() {
    let err = RouterBuilder::new(spec(GREET_SPEC))
        .with_operation(
            "greet",
            handler(|_ctx: &mut Context, _req: Request| {
                Ok(Response::send(GreetResponse::Ok(Reply {
                    greeting: "hi".into(),
                })))
            }),
            vec![],
        )
        .build()
        .unwrap_err();
    assert_eq!(
        err.errors().map(|d| d.kind).collect::<Vec<_>>(),
        vec![DiagnosticKind::UnhandledRequestBody]
    );
}

const XML_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Xml, version: "1.0" }
paths:
  /report:
    get:
      operationId: report
      responses:
        "200":
          description: report
          content:
            application/xml: { schema: { type: string } }
"#;

#[test]
fn test_missing_codec_is_reported_per_media_type() {
    let report = || handler(|_ctx: &mut Context, _req: Request| Ok(ok("r".to_string())));
    let err = RouterBuilder::new(spec(XML_SPEC))
        .with_operation("report", report(), vec![])
        .build()
        .unwrap_err();
    let errors: Vec<_> = err.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::MissingCodec);
    assert_eq!(errors[0].subject, "application/xml");
    assert!(errors[0].message.contains("GET /report"));

    let router = RouterBuilder::new(spec(XML_SPEC))
        .with_options(RouterOptions {
            handle_all_content_types: Severity::Warn,
            ..Default::default()
        })
        .with_operation("report", report(), vec![])
        .build()
        .unwrap();
    // The declared codec is missing, so the response falls back to JSON.
    let resp = send(&router, "GET", "/report", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), br#""r""#);
}

const REPORT_FORMAT_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Reports, version: "1.0" }
paths:
  /report.{format}:
    get:
      operationId: getReport
      parameters:
        - { name: format, in: path, required: true, schema: { type: string } }
      responses:
        "200": { description: report, content: { text/plain: { schema: { type: string } } } }
"#;

#[derive(Debug, Deserialize, Reflect)]
pub struct FormatPath {
    pub format: String,
}

#[test]
fn test_partial_segment_placeholder_fails_the_build() {
    let err = RouterBuilder::new(spec(REPORT_FORMAT_SPEC))
        .with_operation(
            "getReport",
            handler(|_ctx: &mut Context, req: Request<Nil, FormatPath>| Ok(ok(req.path.format))),
            vec![],
        )
        .build()
        .unwrap_err();
    let errors: Vec<_> = err.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::UnsupportedPathTemplate);
    assert_eq!(errors[0].subject, "report.{format}");
    assert_eq!(errors[0].location, "GET /report.{format}");
}

#[test]
fn test_options_from_yaml_drive_the_build() {
    let options = RouterOptions::from_yaml_str(
        r#"
must_handle_all_operations: warn
exclude_operations: [B]
"#,
    )
    .unwrap();
    let router = RouterBuilder::new(spec(ABC_SPEC))
        .with_options(options)
        .with_operation("A", letter("a"), vec![])
        .with_operation("B", letter("b"), vec![])
        .build()
        .unwrap();
    assert_eq!(router.route_count(), 1);
}
