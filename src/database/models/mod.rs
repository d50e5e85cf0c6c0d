pub mod asset;
pub mod bill;
pub mod category;
pub mod notification;
pub mod scheduled_payment;
pub mod team;
pub mod transaction;
pub mod user;
pub mod workspace;

pub use asset::Asset;
pub use bill::{Bill, BillView, Reminder};
pub use category::Category;
pub use notification::Notification;
pub use scheduled_payment::ScheduledPayment;
pub use team::{InvitationRow, InvitationView, MemberRow, MemberView, Team, TeamInvitation, TeamMember, TeamRef};
pub use transaction::{Transaction, TransactionView};
pub use user::{User, UserSummary};
pub use workspace::Workspace;
