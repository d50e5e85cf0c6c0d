// handlers/public/mod.rs - endpoints that need no session

pub mod auth; // POST /api/auth/register, POST /api/auth/login
pub mod root; // GET /, GET /health

pub use auth::{login, register};
pub use root::{health, root};
