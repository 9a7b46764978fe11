//! # RosterSync Engine
//!
//! Runs the roster service: a single actor that owns all state, executes the
//! notification decisions made by the core crate, keeps posted boards current
//! and persists a snapshot after every change.
//!
//! ## Architecture
//!
//! - **Runtime**: the [`Engine`] actor and its [`EngineHandle`]
//! - **Reconciler**: board validity, recreation and scrim expiry
//! - **Maintenance**: rollover, backups, reminders, the weekly sweep and their schedules
//! - **Dispatch**: notification texts and best-effort direct-message batches
//! - **Reply**: mapping of command outcomes to user-facing messages
//! - **Config**: environment configuration

pub mod config;
pub mod dispatch;
pub mod maintenance;
pub mod reconciler;
pub mod reply;
pub mod runtime;

pub use config::EngineConfig;
pub use reply::Reply;
pub use runtime::{Command, Engine, EngineHandle, start_engine};
