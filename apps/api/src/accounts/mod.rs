// Accounts: registration, login sessions, roles, profiles and contributor search.

pub mod auth;
pub mod handlers;
pub mod password;
pub mod sessions;
pub mod store;
pub mod validation;
