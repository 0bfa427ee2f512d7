use super::envelope::Envelope;
use super::request::{Request, Response};
use crate::binding::{RequestBinder, ResponseBinder};
use crate::codec::Codecs;
use crate::dispatcher::{Context, Dispatch};
use crate::errors::Error;
use crate::shape::{Nil, Reflect, RequestTypes, Shape};
use crate::spec::SpecOperation;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Binds a typed request and produces a typed response.
    Terminal,
    /// Wraps the rest of the chain.
    Middleware,
}

/// What a handler is compiled against.
pub struct CompileContext<'a> {
    pub operation: &'a SpecOperation,
    pub codecs: &'a Codecs,
}

/// The capability set shared by terminal handlers and middlewares.
///
/// The builder reads the declared types for validation, then compiles each
/// handler of a chain into a [`Dispatch`] that captures the next one.
pub trait Handler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Declared body, path-parameter and query-parameter types.
    fn request_types(&self) -> RequestTypes;

    /// Shape of the response envelope; [`Shape::Nil`] when the handler
    /// never produces a typed response.
    fn response_shape(&self) -> Shape;

    /// Where the handler was constructed.
    fn location(&self) -> Option<&'static Location<'static>>;

    fn compile(
        &self,
        ctx: &CompileContext<'_>,
        next: Option<Arc<dyn Dispatch>>,
    ) -> Arc<dyn Dispatch>;
}

/// A terminal handler over `(B, P, Q) -> R`.
pub struct TypedHandler<B, P, Q, R, F> {
    f: Arc<F>,
    location: &'static Location<'static>,
    _types: PhantomData<fn() -> (B, P, Q, R)>,
}

/// Build a terminal handler from a function.
///
/// ```rust,ignore
/// let greet = handler(|_ctx, req: Request<Greeting>| {
///     Ok(Response::send(GreetResponse::Ok(Reply {
///         greeting: format!("Hello {}!", req.body.name),
///     })))
/// });
/// ```
#[track_caller]
pub fn handler<B, P, Q, R, F>(f: F) -> Arc<dyn Handler>
where
    B: DeserializeOwned + Reflect + Send + 'static,
    P: DeserializeOwned + Reflect + Send + 'static,
    Q: DeserializeOwned + Reflect + Send + 'static,
    R: Envelope,
    F: Fn(&mut Context, Request<B, P, Q>) -> Result<Response<R>, Error> + Send + Sync + 'static,
{
    Arc::new(TypedHandler {
        f: Arc::new(f),
        location: Location::caller(),
        _types: PhantomData,
    })
}

impl<B, P, Q, R, F> Handler for TypedHandler<B, P, Q, R, F>
where
    B: DeserializeOwned + Reflect + Send + 'static,
    P: DeserializeOwned + Reflect + Send + 'static,
    Q: DeserializeOwned + Reflect + Send + 'static,
    R: Envelope,
    F: Fn(&mut Context, Request<B, P, Q>) -> Result<Response<R>, Error> + Send + Sync + 'static,
{
    fn kind(&self) -> HandlerKind {
        HandlerKind::Terminal
    }

    fn request_types(&self) -> RequestTypes {
        RequestTypes {
            body: B::shape(),
            path: P::shape(),
            query: Q::shape(),
        }
    }

    fn response_shape(&self) -> Shape {
        R::shape()
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }

    fn compile(
        &self,
        ctx: &CompileContext<'_>,
        next: Option<Arc<dyn Dispatch>>,
    ) -> Arc<dyn Dispatch> {
        Arc::new(TerminalDispatcher {
            f: Arc::clone(&self.f),
            request: RequestBinder::<B, P, Q>::new(ctx.operation, ctx.codecs),
            response: ResponseBinder::<R>::new(ctx.operation, ctx.codecs),
            next,
        })
    }
}

struct TerminalDispatcher<B, P, Q, R, F> {
    f: Arc<F>,
    request: RequestBinder<B, P, Q>,
    response: ResponseBinder<R>,
    next: Option<Arc<dyn Dispatch>>,
}

impl<B, P, Q, R, F> Dispatch for TerminalDispatcher<B, P, Q, R, F>
where
    B: DeserializeOwned + Reflect + Send + 'static,
    P: DeserializeOwned + Reflect + Send + 'static,
    Q: DeserializeOwned + Reflect + Send + 'static,
    R: Envelope,
    F: Fn(&mut Context, Request<B, P, Q>) -> Result<Response<R>, Error> + Send + Sync + 'static,
{
    fn dispatch(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.with_next(self.next.as_ref(), |ctx| {
            let request = self.request.bind(ctx)?;
            let response = (self.f)(ctx, request)?;
            self.response.bind(ctx, response)
        })
    }
}

/// A middleware producing envelope `R`.
pub struct MiddlewareHandler<R, F> {
    f: Arc<F>,
    location: &'static Location<'static>,
    _envelope: PhantomData<fn() -> R>,
}

/// Build a middleware from a function.
///
/// The function runs the rest of the chain with [`Context::next`]. Returning
/// `Some(response)` writes it unless a response was already written;
/// returning `None` leaves the context as it is.
///
/// ```rust,ignore
/// let auth = middleware(|ctx: &mut Context| {
///     if ctx.header("authorization").is_none() {
///         return Ok(Some(Response::send(AuthFailure::Unauthorized)));
///     }
///     ctx.next()?;
///     Ok(None)
/// });
/// ```
#[track_caller]
pub fn middleware<R, F>(f: F) -> Arc<dyn Handler>
where
    R: Envelope,
    F: Fn(&mut Context) -> Result<Option<Response<R>>, Error> + Send + Sync + 'static,
{
    Arc::new(MiddlewareHandler {
        f: Arc::new(f),
        location: Location::caller(),
        _envelope: PhantomData,
    })
}

impl<R, F> Handler for MiddlewareHandler<R, F>
where
    R: Envelope,
    F: Fn(&mut Context) -> Result<Option<Response<R>>, Error> + Send + Sync + 'static,
{
    fn kind(&self) -> HandlerKind {
        HandlerKind::Middleware
    }

    fn request_types(&self) -> RequestTypes {
        RequestTypes::nil()
    }

    fn response_shape(&self) -> Shape {
        R::shape()
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }

    fn compile(
        &self,
        ctx: &CompileContext<'_>,
        next: Option<Arc<dyn Dispatch>>,
    ) -> Arc<dyn Dispatch> {
        Arc::new(MiddlewareDispatcher {
            f: Arc::clone(&self.f),
            response: ResponseBinder::<R>::new(ctx.operation, ctx.codecs),
            next,
        })
    }
}

struct MiddlewareDispatcher<R, F> {
    f: Arc<F>,
    response: ResponseBinder<R>,
    next: Option<Arc<dyn Dispatch>>,
}

impl<R, F> Dispatch for MiddlewareDispatcher<R, F>
where
    R: Envelope,
    F: Fn(&mut Context) -> Result<Option<Response<R>>, Error> + Send + Sync + 'static,
{
    fn dispatch(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.with_next(self.next.as_ref(), |ctx| match (self.f)(ctx)? {
            Some(response) => self.response.bind(ctx, response),
            None => Ok(()),
        })
    }
}

/// A middleware that never produces a typed response.
pub type NilMiddleware<F> = MiddlewareHandler<Nil, F>;
