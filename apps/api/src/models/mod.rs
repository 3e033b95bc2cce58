pub mod application;
pub mod group;
pub mod invitation;
pub mod membership;
pub mod project;
pub mod user;
