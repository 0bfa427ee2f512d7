#![allow(dead_code)]

use oasrouter::{OasRouter, Specification};
use serde_json::Value;

pub const GREET_SPEC: &str = r#"
openapi: 3.1.0
info: { title: Greeter, version: "1.0" }
paths:
  /v1/greet:
    post:
      operationId: greet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                name: { type: string }
      responses:
        "200":
          description: greeting
          content:
            application/json:
              schema:
                type: object
                properties:
                  greeting: { type: string }
"#;

pub fn spec(yaml: &str) -> Specification {
    Specification::from_yaml_str(yaml).unwrap()
}

/// Build an `http::Request` with an optional JSON body.
pub fn request(method: &str, uri: &str, body: Option<Value>) -> http::Request<Vec<u8>> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    let bytes = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            serde_json::to_vec(&v).unwrap()
        }
        None => Vec::new(),
    };
    builder.body(bytes).unwrap()
}

pub fn send(
    router: &OasRouter,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> http::Response<Vec<u8>> {
    router.handle(request(method, uri, body))
}

pub fn json_body(response: &http::Response<Vec<u8>>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

pub fn header<'a>(response: &'a http::Response<Vec<u8>>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// A spec file that lives as long as the returned handle.
    pub fn spec_file(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("oasrouter_spec_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}

pub mod test_server {
    use std::net::TcpListener;
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    /// Configure the coroutine runtime once per test binary.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// A port that was free a moment ago.
    pub fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }
}
