//! Shared data types exchanged between the backend and its API clients.
//!
//! `model` contains response payloads, `requests` the request payloads.
//! Everything here is plain serde data; no business logic.

pub mod model;
pub mod requests;
