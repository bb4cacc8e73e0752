//! CineSync wire protocol.
//!
//! Every frame exchanged with a client is a JSON object whose single key is
//! the kind name and whose value holds that kind's camelCase fields:
//!
//! ```json
//! {"KickNotificationEvent": {"initiator": "…", "target": "…"}}
//! ```
//!
//! Kinds form closed sum types ([`events::NotificationEvent`] outbound,
//! [`commands::ClientCommand`] inbound) matched explicitly in [`codec`].

pub mod codec;
pub mod commands;
pub mod delivery;
pub mod events;
