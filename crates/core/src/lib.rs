//! # RosterSync Core
//!
//! Domain types and the synchronous state machines behind the weekly sign-up boards:
//! roster membership, absence windows, quorum notification debounce and board
//! bindings. Nothing in this crate performs I/O except through the
//! [`platform::ChatPlatform`] trait it defines.

pub mod absence;
pub mod board;
pub mod clock;
pub mod errors;
pub mod models;
pub mod notify;
pub mod platform;
pub mod roster;
pub mod state;

pub mod mock;
