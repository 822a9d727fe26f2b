//! HTTP gateway for Marksheet.
//!
//! Exposes the [`Marksheet`](marksheet_store::Marksheet) service over a small
//! set of GET routes, plus `POST /seed`. Failures come back as
//! `{"err": "<message>"}` with a status matching the error kind.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::MarksheetServer;
