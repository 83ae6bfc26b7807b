//! Game simulation modules

pub mod combat;
pub mod entity;
pub mod error;
pub mod factory;
pub mod input;
pub mod phase;
pub mod physics;
pub mod room;
pub mod rules;
pub mod snapshot;
pub mod spatial;

pub use entity::{PlayerId, Stickman, Team, TeamId, Teams};
pub use error::RoomError;
pub use phase::GamePhase;
pub use room::Room;
pub use snapshot::RoomSnapshot;
