//! # Reply Mapping
//!
//! Turns command outcomes into the short messages shown to whoever issued the
//! command. Domain errors that the user caused are echoed back as-is; internal
//! failures are logged and replaced by a generic message.

use tracing::error;

use rostersync_core::errors::RosterError;

const INTERNAL_FAILURE: &str = "Something went wrong on our side, please try again later.";
const UNAVAILABLE: &str = "The roster service is restarting, please try again in a moment.";

/// Message returned to the actor of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Only visible to the actor.
    pub ephemeral: bool,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn unavailable() -> Self {
        Self::ephemeral(UNAVAILABLE)
    }
}

/// Errors always produce an ephemeral reply.
impl From<RosterError> for Reply {
    fn from(err: RosterError) -> Self {
        match &err {
            RosterError::AlreadyMember { .. }
            | RosterError::NotMember { .. }
            | RosterError::CapacityExceeded { .. }
            | RosterError::UnknownUnit(_)
            | RosterError::Validation(_) => Reply::ephemeral(err.to_string()),
            RosterError::StaleBoard { .. } | RosterError::ReconcileFailed(_) => {
                error!("Board operation failed: {}", err);
                Reply::ephemeral("Could not update the board in this channel. Check my permissions and try again.")
            }
            RosterError::CorruptSnapshot(_) | RosterError::DeliveryFailed { .. } | RosterError::Storage(_) => {
                error!("Command failed: {:?}", err);
                Reply::ephemeral(INTERNAL_FAILURE)
            }
        }
    }
}

pub fn map_error(err: RosterError) -> Reply {
    Reply::from(err)
}
