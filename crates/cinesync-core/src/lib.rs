//! CineSync Core — shared domain abstractions.
//!
//! This crate defines the traits, snapshot types and error taxonomy that the
//! room engine, the storage adapters and the API server all depend on. It
//! contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod collaborators;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
pub mod rng;
