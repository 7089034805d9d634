//! # Dispatch server
//! The HTTP front end of the campus delivery engine. It is responsible for:
//! * Identifying the caller from the gateway's actor headers.
//! * Handing each request to the order lifecycle and rider dispatch engine.
//! * Storing the engine's notifications so that users can read them later.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/orders`: Place an order (POST) or list the caller's orders (GET).
//! * `/orders/available`: Ready orders that no rider has taken yet.
//! * `/orders/{id}`, `/orders/{id}/timeline`: Order details and history.
//! * `/orders/{id}/status|cancel|claim|reject|assign|rate`: Lifecycle and dispatch actions.
//! * `/riders/me/location|availability|orders`: The calling rider's own state.
//! * `/notifications`: The caller's notification inbox.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
