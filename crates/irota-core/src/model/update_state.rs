// ── Per-device update state machine ──
//
// Forward-only transitions of one OTA attempt. `Success` and `Failed` are
// terminal for that attempt; a new attempt re-enters `Checking`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateState {
    #[default]
    Idle,
    Checking,
    Downloading,
    Installing,
    Success,
    Failed,
}

/// Every legal `(from, to)` edge.
const TRANSITIONS: &[(UpdateState, UpdateState)] = &[
    (UpdateState::Idle, UpdateState::Checking),
    (UpdateState::Success, UpdateState::Checking),
    (UpdateState::Failed, UpdateState::Checking),
    (UpdateState::Checking, UpdateState::Downloading),
    (UpdateState::Checking, UpdateState::Failed),
    (UpdateState::Downloading, UpdateState::Installing),
    (UpdateState::Downloading, UpdateState::Failed),
    (UpdateState::Installing, UpdateState::Success),
    (UpdateState::Installing, UpdateState::Failed),
];

impl UpdateState {
    pub fn can_transition_to(self, next: Self) -> bool {
        TRANSITIONS.contains(&(self, next))
    }

    /// Validate and return the next state.
    pub fn transition(self, next: Self) -> Result<Self, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// An update is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Checking | Self::Downloading | Self::Installing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}
