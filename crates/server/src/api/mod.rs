pub mod audit;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod middleware;
pub mod routes;
pub mod tickets;
pub mod workflow;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
