//! Database schema.
//!
//! The tables are created by the SQL files under `migrations/`, embedded
//! here so the server can bring a database up to date at startup.

use sqlx::migrate::Migrator;

/// Room snapshots, one row per room.
pub const ROOMS_TABLE: &str = "rooms";

/// Chat history; rows are removed with their room.
pub const ROOM_MESSAGES_TABLE: &str = "room_messages";

/// Embedded migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
