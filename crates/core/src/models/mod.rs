pub mod absence;
pub mod board;
pub mod roster;
pub mod schedule;
pub mod snapshot;
