// handlers/elevated/mod.rs - scheduler-only endpoints guarded by the cron secret

pub mod notifications; // GET /api/notifications/send

pub use notifications::notifications_send;
