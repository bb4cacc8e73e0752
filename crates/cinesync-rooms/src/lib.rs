//! CineSync — watch-room synchronization.
//!
//! Responsible for the room and message aggregates, the store that owns a
//! room's single working copy, and the command handlers that run the
//! load-mutate-persist-publish cycle for every viewer action.

pub mod application;
pub mod domain;
