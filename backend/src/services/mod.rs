//! HTTP services, one module per API resource. Each module exposes a
//! `configure_routes()` returning the Actix `Scope` that `main` mounts.

pub mod auth;
pub mod recipes;
pub mod sitecontent;
pub mod staff;
