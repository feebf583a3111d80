//! Authentication service repositories

pub mod account;
pub mod admin;

pub use account::{AccountRepository, NewAccount};
pub use admin::AdminRepository;
