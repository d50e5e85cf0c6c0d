pub mod bills;
pub mod changeset;
pub mod manager;
pub mod models;
pub mod repository;
pub mod teams;

pub use changeset::Changeset;
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{Record, Repository, Scope};
