use thiserror::Error;

use crate::models::roster::UnitKey;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("<@{participant}> is already signed up for {unit}")]
    AlreadyMember { unit: UnitKey, participant: String },

    #[error("<@{participant}> is not signed up for {unit}")]
    NotMember { unit: UnitKey, participant: String },

    #[error("{unit} is already full ({capacity}/{capacity})")]
    CapacityExceeded { unit: UnitKey, capacity: usize },

    #[error("Unknown roster unit: {0}")]
    UnknownUnit(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Stale board in channel {channel_id}: {reason}")]
    StaleBoard { channel_id: String, reason: String },

    #[error("Failed to deliver message to {recipient}: {reason}")]
    DeliveryFailed { recipient: String, reason: String },

    #[error("Failed to reconcile board: {0}")]
    ReconcileFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] eyre::Report),
}

pub type RosterResult<T> = Result<T, RosterError>;
