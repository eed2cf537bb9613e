//! Minimal read-only HTTP surface. Methods:
//!
//! - `GET /accounts/{debtor_id}/{creditor_id}/reachable` — 204 if the account exists and is not deleted, 404 otherwise.
//! - `GET /accounts/{debtor_id}/{creditor_id}/config` — 200 with the account's `config_data` body, 404 otherwise.

pub mod server;

pub use server::{HttpServer, HttpServerState};
