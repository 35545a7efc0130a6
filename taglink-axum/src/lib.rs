//! Ready-to-use Axum routes for the Taglink backend
//!
//! [`create_router`] builds the full HTTP JSON surface over a
//! [`Taglink`](taglink::Taglink) instance: login, registration, cards,
//! second-factor setup, magic links, trusted devices and the audit trail.
//! When constructed without a Taglink instance (missing storage
//! configuration), every endpoint answers `503` instead of failing later.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod types;

pub use error::ApiError;
pub use extractors::ConnectionInfo;
pub use routes::{AppState, create_router};
