mod common;

use common::{header, json_body, request, send, spec, GREET_SPEC};
use http::StatusCode;
use oasrouter::middleware::{error_handler, request_logger};
use oasrouter::{
    handler, middleware, ok, BindLocation, Context, Envelope, Error, Nil, OperationValidation,
    Reflect, Request, Response, RouterBuilder, RouterOptions, Severity,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize, Reflect)]
pub struct Greeting {
    pub name: String,
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

fn greet_router() -> oasrouter::OasRouter {
    RouterBuilder::new(spec(GREET_SPEC))
        .use_middleware(error_handler())
        .with_operation(
            "greet",
            handler(|_ctx: &mut Context, req: Request<Greeting>| {
                Ok(Response::send(GreetResponse::Ok(Reply {
                    greeting: format!("Hello {}!", req.body.name),
                })))
            }),
            vec![],
        )
        .build()
        .unwrap()
}

#[test]
fn test_greet_round_trip() {
    let router = greet_router();
    let resp = send(&router, "POST", "/v1/greet", Some(json!({"name": "Ori"})));
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some("application/json"));
    assert_eq!(json_body(&resp), json!({"greeting": "Hello Ori!"}));
}

#[test]
fn test_unknown_path_and_wrong_method() {
    let router = greet_router();
    assert_eq!(send(&router, "GET", "/nope", None).status(), StatusCode::NOT_FOUND);

    let resp = send(&router, "DELETE", "/v1/greet", None);
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&resp, "allow"), Some("POST"));
}

#[test]
fn test_malformed_body_is_a_body_bad_request() {
    let router = greet_router();
    let req = http::Request::builder()
        .method("POST")
        .uri("/v1/greet")
        .header("content-type", "application/json; charset=utf-8")
        .body(b"{not json".to_vec())
        .unwrap();
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header(&resp, "content-type"), Some("application/problem+json"));
    assert_eq!(json_body(&resp)["in"], "body");
}

#[test]
fn test_unregistered_request_content_type_is_a_server_error() {
    let router = greet_router();
    let req = http::Request::builder()
        .method("POST")
        .uri("/v1/greet")
        .header("content-type", "application/xml")
        .body(b"<name>Ori</name>".to_vec())
        .unwrap();
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body().is_empty());
}

#[test]
fn test_missing_content_type_defaults_to_json() {
    let router = greet_router();
    let req = http::Request::builder()
        .method("POST")
        .uri("/v1/greet")
        .body(br#"{"name":"Ada"}"#.to_vec())
        .unwrap();
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(&resp)["greeting"], "Hello Ada!");
}

const TASKS_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Tasks, version: "1.0" }
paths:
  /tasks:
    get:
      operationId: listTasks
      parameters:
        - name: pageSize
          in: query
          schema: { type: integer, maximum: 20 }
        - name: tag
          in: query
          explode: false
          schema: { type: array, items: { type: string } }
      responses:
        "200":
          description: tasks
          content:
            application/json:
              schema: { type: array, items: { type: string } }
"#;

#[derive(Debug, Default, Deserialize, Reflect)]
pub struct TaskQuery {
    #[oas(query = "pageSize")]
    pub page_size: Option<i32>,
    #[serde(default)]
    pub tag: Vec<String>,
}

fn list_tasks() -> Arc<dyn oasrouter::Handler> {
    handler(|_ctx: &mut Context, req: Request<Nil, Nil, TaskQuery>| {
        let mut out = vec![format!("page size {}", req.query.page_size.unwrap_or(20))];
        out.extend(req.query.tag);
        Ok(ok(out))
    })
}

#[test]
fn test_query_parameters_bind() {
    let router = RouterBuilder::new(spec(TASKS_SPEC))
        .with_operation("listTasks", list_tasks(), vec![])
        .build()
        .unwrap();
    let resp = send(&router, "GET", "/tasks?pageSize=5&tag=a,b", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(&resp), json!(["page size 5", "a", "b"]));

    let resp = send(&router, "GET", "/tasks", None);
    assert_eq!(json_body(&resp), json!(["page size 20"]));
}

#[test]
fn test_query_value_over_maximum_is_rejected() {
    let router = RouterBuilder::new(spec(TASKS_SPEC))
        .use_middleware(error_handler())
        .with_operation("listTasks", list_tasks(), vec![])
        .build()
        .unwrap();
    let resp = send(&router, "GET", "/tasks?pageSize=30", None);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(&resp);
    assert_eq!(body["in"], "query");
    assert!(body["detail"].as_str().unwrap().contains("pageSize"));
}

#[test]
fn test_bad_request_reaches_outer_middleware() {
    let seen: Arc<Mutex<Option<(BindLocation, String)>>> = Arc::default();
    let observer = {
        let seen = Arc::clone(&seen);
        middleware::<Nil, _>(move |ctx: &mut Context| {
            let result = ctx.next();
            if let Err(Error::BadRequest(bad)) = &result {
                *seen.lock().unwrap() = Some((bad.location, bad.to_string()));
            }
            result.map(|()| None)
        })
    };
    let router = RouterBuilder::new(spec(TASKS_SPEC))
        .use_middleware(observer)
        .with_operation("listTasks", list_tasks(), vec![])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/tasks?pageSize=30", None);
    // Nobody translated the error, so the client sees a bare 500.
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body().is_empty());

    let (location, message) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(location, BindLocation::Query);
    assert!(message.contains("pageSize"));
}

#[test]
fn test_repeated_scalar_query_parameter_is_rejected() {
    let router = RouterBuilder::new(spec(TASKS_SPEC))
        .use_middleware(error_handler())
        .with_operation("listTasks", list_tasks(), vec![])
        .build()
        .unwrap();
    let resp = send(&router, "GET", "/tasks?pageSize=1&pageSize=2", None);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(&resp)["detail"]
        .as_str()
        .unwrap()
        .contains("2 values"));
}

const SECRET_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Secrets, version: "1.0" }
paths:
  /secret:
    get:
      operationId: getSecret
      responses:
        "200":
          description: the secret
          content:
            text/plain:
              schema: { type: string }
        "401":
          description: no credentials
"#;

#[derive(Reflect, Envelope)]
pub enum AuthFailure {
    #[oas(status = 401)]
    Unauthorized,
}

struct Probes {
    logged: Arc<Mutex<Vec<u16>>>,
    terminal_calls: Arc<AtomicUsize>,
}

impl Probes {
    fn new() -> Self {
        Self {
            logged: Arc::default(),
            terminal_calls: Arc::default(),
        }
    }

    fn logger(&self) -> Arc<dyn oasrouter::Handler> {
        let logged = Arc::clone(&self.logged);
        middleware::<Nil, _>(move |ctx: &mut Context| {
            ctx.next()?;
            logged.lock().unwrap().push(ctx.raw_response().status);
            Ok(None)
        })
    }

    fn terminal(&self) -> Arc<dyn oasrouter::Handler> {
        let calls = Arc::clone(&self.terminal_calls);
        handler(move |_ctx: &mut Context, _req: Request| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ok("swordfish".to_string()))
        })
    }
}

fn auth() -> Arc<dyn oasrouter::Handler> {
    middleware(|ctx: &mut Context| {
        if ctx.header("authorization").is_none() {
            return Ok(Some(Response::send(AuthFailure::Unauthorized)));
        }
        ctx.next()?;
        Ok(None)
    })
}

/// Options for chains that do not produce every declared status.
fn lenient() -> RouterOptions {
    RouterOptions {
        default_operation_validation: OperationValidation {
            handle_all_responses: Severity::Warn,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_short_circuit_is_observed_by_wrapping_logger() {
    let probes = Probes::new();
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .use_middleware(probes.logger())
        .with_operation("getSecret", probes.terminal(), vec![auth()])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/secret", None);
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.body().is_empty());
    assert_eq!(*probes.logged.lock().unwrap(), vec![401]);
    assert_eq!(probes.terminal_calls.load(Ordering::SeqCst), 0);

    let req = http::Request::builder()
        .uri("/secret")
        .header("authorization", "Bearer t")
        .body(Vec::new())
        .unwrap();
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some("text/plain"));
    assert_eq!(resp.body(), b"swordfish");
    assert_eq!(*probes.logged.lock().unwrap(), vec![401, 200]);
    assert_eq!(probes.terminal_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_short_circuit_skips_inner_middlewares() {
    let probes = Probes::new();
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .with_operation("getSecret", probes.terminal(), vec![auth(), probes.logger()])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/secret", None);
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(probes.logged.lock().unwrap().is_empty());
    assert_eq!(probes.terminal_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_nil_body_handler_ignores_the_body() {
    let probes = Probes::new();
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .with_options(lenient())
        .with_operation("getSecret", probes.terminal(), vec![])
        .build()
        .unwrap();
    let req = http::Request::builder()
        .uri("/secret")
        .header("content-type", "application/x-unknown")
        .body(b"\xff\xfe garbage".to_vec())
        .unwrap();
    assert_eq!(router.handle(req).status(), StatusCode::OK);
}

#[test]
fn test_first_written_response_wins() {
    let probes = Probes::new();
    let early = middleware::<Nil, _>(|ctx: &mut Context| {
        ctx.respond(StatusCode::ACCEPTED, Some("text/plain"), b"early".to_vec());
        ctx.next()?;
        Ok(None)
    });
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .with_options(lenient())
        .with_operation("getSecret", probes.terminal(), vec![early])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/secret", None);
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(resp.body(), b"early");
    assert_eq!(probes.terminal_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_outer_envelope_after_inner_write_is_ignored() {
    let probes = Probes::new();
    let late = middleware(|ctx: &mut Context| {
        ctx.next()?;
        Ok(Some(Response::send(AuthFailure::Unauthorized)))
    });
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .with_operation("getSecret", probes.terminal(), vec![late])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/secret", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), b"swordfish");
}

#[test]
fn test_chain_without_response_is_a_server_error() {
    let probes = Probes::new();
    let silent = middleware::<Nil, _>(|_ctx: &mut Context| Ok(None));
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .with_options(lenient())
        .with_operation("getSecret", probes.terminal(), vec![silent])
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/secret", None);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body().is_empty());
    assert_eq!(probes.terminal_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_handler_error_is_a_server_error() {
    let router = RouterBuilder::new(spec(SECRET_SPEC))
        .use_middleware(error_handler())
        .with_operation(
            "getSecret",
            handler(|_ctx: &mut Context, _req: Request| -> Result<Response<AuthFailure>, Error> {
                Err(anyhow::anyhow!("vault is sealed").into())
            }),
            vec![],
        )
        .with_options(lenient())
        .build()
        .unwrap();
    assert_eq!(
        send(&router, "GET", "/secret", None).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

fn panicking_router(recover_on_panic: bool) -> oasrouter::OasRouter {
    RouterBuilder::new(spec(SECRET_SPEC))
        .with_options(RouterOptions {
            recover_on_panic,
            ..lenient()
        })
        .with_operation(
            "getSecret",
            handler(|_ctx: &mut Context, _req: Request| -> Result<Response<AuthFailure>, Error> {
                panic!("handler exploded")
            }),
            vec![auth()],
        )
        .build()
        .unwrap()
}

#[test]
fn test_panic_is_recovered_as_500() {
    let router = panicking_router(true);
    let req = http::Request::builder()
        .uri("/secret")
        .header("authorization", "Bearer t")
        .body(Vec::new())
        .unwrap();
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body().is_empty());
}

#[test]
fn test_panic_propagates_when_recovery_is_off() {
    let router = panicking_router(false);
    let req = http::Request::builder()
        .uri("/secret")
        .header("authorization", "Bearer t")
        .body(Vec::new())
        .unwrap();
    let outcome = catch_unwind(AssertUnwindSafe(|| router.handle(req)));
    assert!(outcome.is_err());
}

const PETS_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Pets, version: "1.0" }
paths:
  /pets/{petId}:
    get:
      operationId: getPet
      parameters:
        - { name: petId, in: path, required: true, schema: { type: integer, format: int64, minimum: 1 } }
      responses:
        "200":
          description: a pet
          content:
            application/json:
              schema:
                type: object
                properties:
                  id: { type: integer, format: int64 }
                  name: { type: string }
        "404":
          description: no such pet
  /owners/{name}:
    get:
      operationId: getOwner
      parameters:
        - { name: name, in: path, required: true, schema: { type: string } }
      responses:
        "200":
          description: owner
          content:
            application/json:
              schema: { type: string }
"#;

#[derive(Debug, Deserialize, Reflect)]
pub struct PetPath {
    #[oas(path = "petId")]
    pub pet_id: i64,
}

#[derive(Debug, Serialize, Reflect)]
pub struct Pet {
    pub id: i64,
    pub name: String,
}

#[derive(Reflect, Envelope)]
pub enum GetPetResponse {
    #[oas(status = 200)]
    Ok(Pet),
    #[oas(status = 404)]
    NotFound,
}

#[derive(Debug, Deserialize, Reflect)]
pub struct OwnerPath {
    pub name: String,
}

fn pets_router() -> oasrouter::OasRouter {
    RouterBuilder::new(spec(PETS_SPEC))
        .use_middleware(request_logger())
        .use_middleware(error_handler())
        .with_operation(
            "getPet",
            handler(|_ctx: &mut Context, req: Request<Nil, PetPath>| {
                if req.path.pet_id == 7 {
                    return Ok(Response::send(GetPetResponse::Ok(Pet {
                        id: 7,
                        name: "Rex".into(),
                    }))
                    .header("x-pet-source", "kennel"));
                }
                Ok(Response::send(GetPetResponse::NotFound))
            }),
            vec![],
        )
        .with_operation(
            "getOwner",
            handler(|_ctx: &mut Context, req: Request<Nil, OwnerPath>| Ok(ok(req.path.name))),
            vec![],
        )
        .build()
        .unwrap()
}

#[test]
fn test_path_parameters_bind_and_select_arm() {
    let router = pets_router();
    let resp = send(&router, "GET", "/pets/7", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-pet-source"), Some("kennel"));
    assert_eq!(json_body(&resp), json!({"id": 7, "name": "Rex"}));

    let resp = send(&router, "GET", "/pets/8", None);
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.body().is_empty());
    assert!(header(&resp, "content-type").is_none());
}

#[test]
fn test_path_parameter_errors() {
    let router = pets_router();
    let resp = send(&router, "GET", "/pets/rex", None);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&resp)["in"], "path");

    let resp = send(&router, "GET", "/pets/0", None);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(&resp)["detail"].as_str().unwrap().contains("petId"));
}

#[test]
fn test_path_parameters_are_percent_decoded() {
    let router = pets_router();
    let resp = send(&router, "GET", "/owners/Jane%20Doe", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(&resp), json!("Jane Doe"));
}

const VALUE_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Values, version: "1.0" }
paths:
  /value:
    get:
      operationId: getValue
      parameters:
        - { name: kind, in: query, schema: { type: string } }
      responses:
        "200":
          description: a string or an integer
          content:
            application/json:
              schema:
                oneOf:
                  - { type: string }
                  - { type: integer }
"#;

#[derive(Debug, Serialize, Reflect)]
#[serde(untagged)]
pub enum MultiType {
    A(String),
    B(i64),
}

#[derive(Reflect, Envelope)]
pub enum ValueResponse {
    #[oas(status = 200)]
    Ok(MultiType),
}

#[derive(Debug, Default, Deserialize, Reflect)]
pub struct ValueQuery {
    pub kind: Option<String>,
}

#[test]
fn test_sum_type_encodes_populated_variant() {
    let router = RouterBuilder::new(spec(VALUE_SPEC))
        .with_operation(
            "getValue",
            handler(|_ctx: &mut Context, req: Request<Nil, Nil, ValueQuery>| {
                let value = match req.query.kind.as_deref() {
                    Some("number") => MultiType::B(42),
                    _ => MultiType::A("forty-two".into()),
                };
                Ok(Response::send(ValueResponse::Ok(value)))
            }),
            vec![],
        )
        .build()
        .unwrap();

    let resp = send(&router, "GET", "/value", None);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), br#""forty-two""#);

    let resp = send(&router, "GET", "/value?kind=number", None);
    assert_eq!(json_body(&resp), json!(42));
}

#[test]
fn test_undeclared_status_override_is_a_server_error() {
    let router = RouterBuilder::new(spec(VALUE_SPEC))
        .with_operation(
            "getValue",
            handler(|_ctx: &mut Context, _req: Request<Nil, Nil, ValueQuery>| {
                Ok(Response::send(ValueResponse::Ok(MultiType::B(1))).status(418))
            }),
            vec![],
        )
        .build()
        .unwrap();
    assert_eq!(
        send(&router, "GET", "/value", None).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_status_override_must_match_populated_variant() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let observer = {
        let seen = Arc::clone(&seen);
        middleware::<Nil, _>(move |ctx: &mut Context| {
            let result = ctx.next();
            if let Err(err @ Error::MismatchedResponseStatus { .. }) = &result {
                seen.lock().unwrap().push(err.to_string());
            }
            result.map(|()| None)
        })
    };
    let router = RouterBuilder::new(spec(PETS_SPEC))
        .with_options(RouterOptions {
            must_handle_all_operations: Severity::Off,
            ..Default::default()
        })
        .use_middleware(observer)
        .with_operation(
            "getPet",
            handler(|_ctx: &mut Context, req: Request<Nil, PetPath>| {
                let resp = match req.path.pet_id {
                    1 => Response::send(GetPetResponse::Ok(Pet {
                        id: 1,
                        name: "Rex".into(),
                    }))
                    .status(404),
                    2 => Response::send(GetPetResponse::NotFound).status(200),
                    _ => Response::send(GetPetResponse::NotFound).status(404),
                };
                Ok(resp)
            }),
            vec![],
        )
        .build()
        .unwrap();

    // A payload is never dropped for an empty arm.
    let resp = send(&router, "GET", "/pets/1", None);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body().is_empty());

    // An empty variant never answers with the status of a payload arm.
    let resp = send(&router, "GET", "/pets/2", None);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Restating the populated variant's own status is fine.
    assert_eq!(send(&router, "GET", "/pets/3", None).status(), StatusCode::NOT_FOUND);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("GetPetResponse::Ok"), "{}", seen[0]);
    assert!(seen[1].contains("GetPetResponse::NotFound"), "{}", seen[1]);
}

#[test]
fn test_request_id_comes_from_header() {
    let seen: Arc<Mutex<Option<String>>> = Arc::default();
    let capture = {
        let seen = Arc::clone(&seen);
        middleware::<Nil, _>(move |ctx: &mut Context| {
            *seen.lock().unwrap() = Some(ctx.request_id().to_string());
            ctx.next()?;
            Ok(None)
        })
    };
    let router = RouterBuilder::new(spec(GREET_SPEC))
        .use_middleware(capture)
        .with_operation(
            "greet",
            handler(|_ctx: &mut Context, req: Request<Greeting>| {
                Ok(Response::send(GreetResponse::Ok(Reply {
                    greeting: req.body.name,
                })))
            }),
            vec![],
        )
        .build()
        .unwrap();

    let mut req = request("POST", "/v1/greet", Some(json!({"name": "x"})));
    req.headers_mut().insert(
        "x-request-id",
        http::HeaderValue::from_static("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
    );
    let resp = router.handle(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        seen.lock().unwrap().as_deref(),
        Some("01ARZ3NDEKTSV4RRFFQ69G5FAV")
    );
    // The id is a request-side input only.
    assert_eq!(header(&resp, "x-request-id"), None);
}
