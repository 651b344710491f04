//! HTTP gateway that validates, optimizes and answers uploaded images.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
