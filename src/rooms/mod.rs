//! Room lifecycle: per-room actor tasks and the manager that routes to them

pub mod manager;
pub mod task;

pub use manager::RoomManager;
