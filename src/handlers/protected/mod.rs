// handlers/protected/mod.rs - session-protected API
//
// Every handler here receives the `Principal` inserted by
// validate_user_middleware and scopes its queries by it.

pub mod assets; // /api/assets
pub mod auth; // GET /api/auth/whoami
pub mod bills; // /api/bills
pub mod categories; // /api/categories
pub mod invitations; // /api/invitations
pub mod notifications; // /api/notifications
pub mod profile; // /api/profile
pub mod scheduled_payments; // /api/scheduled-payments
pub mod teams; // /api/teams
pub mod transactions; // /api/transactions
