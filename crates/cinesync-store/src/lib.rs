//! PostgreSQL-backed repositories and collaborator lookups for the CineSync
//! room engine.

pub mod pg_directory;
pub mod pg_message_repository;
pub mod pg_room_repository;
pub mod schema;

pub(crate) fn database_error(e: &sqlx::Error) -> cinesync_core::error::DomainError {
    cinesync_core::error::DomainError::Infrastructure(format!("database error: {e}"))
}
