//! Identifies the caller.
//!
//! The server sits behind a gateway that has already authenticated the user. The gateway passes the caller's role
//! and record id in the `X-Actor-Role` and `X-Actor-Id` headers, and [`RequestActor`] turns them into an engine
//! [`Actor`]. Requests without valid actor headers are refused with a 403.
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use dispatch_engine::order_objects::{Actor, Role};
use futures::future::{ready, Ready};
use log::*;

use crate::errors::ServerError;

pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";
pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestActor(pub Actor);

impl RequestActor {
    pub fn actor(&self) -> &Actor {
        &self.0
    }

    /// The rider id of the caller, or an error if the caller is not a rider.
    pub fn rider_id(&self) -> Result<i64, ServerError> {
        match self.0 {
            Actor::Rider(id) => Ok(id),
            other => Err(ServerError::InsufficientPermissions(format!("{other} is not a rider"))),
        }
    }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Result<&'a str, ServerError> {
    req.headers()
        .get(name)
        .ok_or_else(|| ServerError::InsufficientPermissions(format!("The {name} header is missing")))?
        .to_str()
        .map_err(|e| ServerError::InsufficientPermissions(format!("The {name} header is unreadable. {e}")))
}

pub fn actor_from_headers(req: &HttpRequest) -> Result<Actor, ServerError> {
    let role = header(req, ACTOR_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|e| ServerError::InsufficientPermissions(e.to_string()))?;
    let id = header(req, ACTOR_ID_HEADER)?
        .trim()
        .parse::<i64>()
        .map_err(|e| ServerError::InsufficientPermissions(format!("Invalid {ACTOR_ID_HEADER}. {e}")))?;
    if id <= 0 {
        return Err(ServerError::InsufficientPermissions(format!("Invalid {ACTOR_ID_HEADER}: {id}")));
    }
    Ok(Actor::new(role, id))
}

impl FromRequest for RequestActor {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = actor_from_headers(req).map(RequestActor);
        match &result {
            Ok(RequestActor(actor)) => trace!("💻️ Request from {actor}"),
            Err(e) => debug!("💻️ Refusing request to {}. {e}", req.path()),
        }
        ready(result)
    }
}
