use super::request::convert_request;
use super::response::write_response;
use crate::dispatcher::OasRouter;
use http::StatusCode;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// Serves an [`OasRouter`] over `may_minihttp`.
#[derive(Clone)]
pub struct RouterService {
    router: Arc<OasRouter>,
}

impl RouterService {
    pub fn new(router: Arc<OasRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &OasRouter {
        &self.router
    }
}

impl HttpService for RouterService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match convert_request(req) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request");
                let status = StatusCode::BAD_REQUEST;
                res.status_code(status.as_u16() as usize, super::response::reason(status));
                return Ok(());
            }
        };
        write_response(res, self.router.handle(request));
        Ok(())
    }
}
