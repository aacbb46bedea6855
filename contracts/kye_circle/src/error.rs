use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CircleError {
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,
    /// Deposit amount, round length and participant count must be positive
    InvalidConfiguration = 3,
    /// Caller lacks the required role (owner or enrolled participant)
    Unauthorized = 4,
    /// Circle is not active (not started yet, or already complete)
    NotStarted = 5,
    /// Circle was already started
    AlreadyActive = 6,
    /// Identity is already enrolled
    AlreadyEnrolled = 7,
    /// Participant already deposited in the current round
    AlreadyDeposited = 8,
    /// Amount differs from the configured deposit amount
    WrongAmount = 9,
    /// Not every enrolled participant has deposited this round
    RoundIncomplete = 10,
    /// Round length has not elapsed since the last distribution
    RoundNotElapsed = 11,
    /// Enrollment is capped and all seats are taken
    CircleFull = 12,
    /// Every participant has been paid; the circle cannot restart
    CircleComplete = 13,
    /// Arithmetic overflow
    Overflow = 14,
    /// Critical storage data missing (contract state corrupted)
    StorageCorrupted = 15,
}
