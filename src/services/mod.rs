pub mod ai;
pub mod auth;
pub mod conversation;
pub mod guard;
pub mod handoff;
pub mod session;
pub mod store;
