//! On-demand trigger API for scrapper.
//!
//! Lets an operator ingest one feed immediately instead of waiting for the
//! next scheduler tick. Runs go through the same engine as scheduled runs.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
