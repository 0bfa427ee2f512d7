use oasrouter::{handler, middleware, ok, Context, Envelope, Handler, Nil, Reflect, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

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

pub fn greet() -> Arc<dyn Handler> {
    handler(|_ctx: &mut Context, req: Request<Greeting>| {
        Ok(Response::send(GreetResponse::Ok(Reply {
            greeting: format!("Hello {}!", req.body.name),
        })))
    })
}

#[derive(Debug, Deserialize, Reflect)]
pub struct LanguagePath {
    pub language: String,
}

#[derive(Debug, Default, Deserialize, Reflect)]
pub struct LimitQuery {
    pub limit: Option<i32>,
}

#[derive(Reflect, Envelope)]
pub enum ListGreetingsResponse {
    #[oas(status = 200)]
    Ok(Vec<String>),
    #[oas(status = 404)]
    UnknownLanguage,
}

const GREETINGS: &[(&str, &[&str])] = &[
    ("en", &["Hello", "Hi", "Good morning", "Hey there"]),
    ("fr", &["Bonjour", "Salut", "Coucou"]),
    ("de", &["Hallo", "Guten Tag", "Moin"]),
];

pub fn list_greetings() -> Arc<dyn Handler> {
    handler(
        |_ctx: &mut Context, req: Request<Nil, LanguagePath, LimitQuery>| {
            let Some((_, words)) = GREETINGS.iter().find(|(lang, _)| *lang == req.path.language)
            else {
                return Ok(Response::send(ListGreetingsResponse::UnknownLanguage));
            };
            let limit = req.query.limit.map_or(words.len(), |n| n.max(0) as usize);
            let words = words.iter().take(limit).map(|w| w.to_string()).collect();
            Ok(Response::send(ListGreetingsResponse::Ok(words)))
        },
    )
}

pub fn message_of_the_day() -> Arc<dyn Handler> {
    handler(|_ctx: &mut Context, _req: Request| {
        Ok(ok("Typed handlers make for quiet on-call shifts.".to_string()))
    })
}

#[derive(Reflect, Envelope)]
pub enum AuthFailure {
    #[oas(status = 401)]
    Unauthorized,
}

/// Rejects requests without an `Authorization` header.
pub fn require_auth() -> Arc<dyn Handler> {
    middleware(|ctx: &mut Context| {
        if ctx.header("authorization").is_none() {
            return Ok(Some(Response::send(AuthFailure::Unauthorized)));
        }
        ctx.next()?;
        Ok(None)
    })
}
