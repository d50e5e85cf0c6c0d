pub mod auth;
pub mod cron;
pub mod response;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use cron::cron_secret_middleware;
pub use response::{ApiResponse, ApiResult};
pub use validate_user::{validate_user_middleware, Principal};
