use soroban_sdk::{Address, Map};

use crate::circle::{CircleConfig, DistributeAccess, Participant};
use crate::error::CircleError;

/// Owner-only gate.
pub fn require_owner(config: &CircleConfig, caller: &Address) -> Result<(), CircleError> {
    if *caller != config.owner {
        return Err(CircleError::Unauthorized);
    }
    Ok(())
}

/// Participant-only gate. Returns the caller's record on success.
pub fn require_enrolled(
    participants: &Map<Address, Participant>,
    caller: &Address,
) -> Result<Participant, CircleError> {
    match participants.get(caller.clone()) {
        Some(record) if record.enrolled => Ok(record),
        _ => Err(CircleError::Unauthorized),
    }
}

/// Gate for triggering a payout, according to the circle's policy.
pub fn require_distributor(
    access: DistributeAccess,
    participants: &Map<Address, Participant>,
    caller: &Address,
) -> Result<(), CircleError> {
    match access {
        DistributeAccess::Anyone => Ok(()),
        DistributeAccess::Enrolled => require_enrolled(participants, caller).map(|_| ()),
    }
}
