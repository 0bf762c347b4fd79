//! Console HTTP API.
//!
//! JSON routes live under `/api/`; everything except health and the
//! credential flows requires a bearer session. Stored attachments are
//! served under `/blobs/`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
