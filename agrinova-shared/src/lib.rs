pub mod inventory;
pub mod org;
pub mod pagination;
pub mod reports;
pub mod roles;
pub mod session;
pub mod users;
pub mod weather;
