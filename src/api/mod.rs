//! API Module
//!
//! HTTP handlers and routing for the site data service.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
