pub mod account_service;
pub mod bill_service;
pub mod mailer;
pub mod reminders;
pub mod team_service;
