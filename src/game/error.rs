//! Errors returned to the client that issued a room command

/// Room command failures. Display strings are sent verbatim to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Already joined this room")]
    AlreadyJoined,

    #[error("{team_name} is full ({max}/{max} players)")]
    TeamFull { team_name: String, max: usize },
}
