pub mod auth;
pub mod handler;
pub mod response;

pub use auth::session_middleware;
pub use handler::{handle, Endpoint};
pub use response::{ApiResponse, ApiResult};
