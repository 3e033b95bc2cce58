// Per-project group chat, polled by clients.

pub mod handlers;
pub mod store;
