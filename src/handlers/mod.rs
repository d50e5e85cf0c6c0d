// handlers/mod.rs - three security tiers
//
// Public (no session) → Protected (JWT + user row) → Elevated (cron secret)

pub mod elevated; // GET /api/notifications/send
pub mod protected; // /api/* behind jwt_auth + validate_user
pub mod public; // /, /health, /api/auth/register, /api/auth/login
