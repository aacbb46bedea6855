//! Round clock: measures the minimum interval between distributions.
//!
//! All timestamps are ledger seconds (`env.ledger().timestamp()`), which never
//! decrease between transactions.

/// View over the round length and the instant of the last distribution
/// (or the start of the circle, before the first payout).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundClock {
    round_length: u64,
    last_distribution_at: u64,
}

impl RoundClock {
    pub fn new(round_length: u64, last_distribution_at: u64) -> Self {
        Self {
            round_length,
            last_distribution_at,
        }
    }

    /// Earliest timestamp at which the next distribution may happen.
    pub fn next_distribution_at(&self) -> u64 {
        self.last_distribution_at.saturating_add(self.round_length)
    }

    /// True once `round_length` seconds have passed since the last distribution.
    pub fn has_elapsed(&self, now: u64) -> bool {
        now.saturating_sub(self.last_distribution_at) >= self.round_length
    }

    /// Seconds left until the round may be distributed (0 when elapsed).
    pub fn remaining(&self, now: u64) -> u64 {
        self.next_distribution_at().saturating_sub(now)
    }
}
