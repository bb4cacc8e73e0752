//! Shared test doubles for the CineSync room engine.

mod clock;
mod collaborators;
mod repository;
mod rng;
mod transport;

pub use clock::{FixedClock, ManualClock};
pub use collaborators::{StaticMediaCatalog, StaticUserDirectory};
pub use repository::{
    FailingMessageRepository, FailingRoomRepository, InMemoryMessageRepository,
    InMemoryRoomRepository,
};
pub use rng::SequenceRng;
pub use transport::{RecordingTransport, TransportCall};
