//! Application layer: store, handlers, translation and queries.

pub mod command_handlers;
pub mod query_handlers;
pub mod retry;
pub mod room_store;
pub mod translator;
