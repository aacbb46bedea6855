//! Circle engine: enrollment, deposit pooling and rotating payouts.
//!
//! `Circle` is the whole state of one circle. Every operation checks all of
//! its preconditions before touching a field, so a rejected call leaves the
//! aggregate exactly as it was. The contract layer persists the aggregate
//! only after an operation returns `Ok`.
//!
//! Payout order is the order in which participants made their first deposit:
//! the participant at queue position `round_index` receives the pool of that
//! round. No randomness is involved.

use soroban_sdk::{contracttype, Address, Env, Map, Vec};

use crate::access;
use crate::clock::RoundClock;
use crate::error::CircleError;

/// Who may trigger a distribution.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DistributeAccess {
    /// Any address (the round gates still apply).
    Anyone = 0,
    /// Enrolled participants only.
    Enrolled = 1,
}

/// Whether enrollment stops at `required_participants`.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnrollmentCap {
    Capped = 0,
    Uncapped = 1,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CirclePolicy {
    pub distribute_access: DistributeAccess,
    pub enrollment_cap: EnrollmentCap,
}

/// Immutable circle configuration, fixed at deployment.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CircleConfig {
    pub owner: Address,
    /// Token contract that holds custody of the pool
    pub token: Address,
    pub deposit_amount: i128,
    /// Minimum seconds between distributions
    pub round_length: u64,
    pub required_participants: u32,
    pub policy: CirclePolicy,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircleStatus {
    Configured = 0, // Deployed, not started
    Active = 1,     // Rounds in progress
    Complete = 2,   // Every round paid out
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CircleState {
    pub status: CircleStatus,
    /// Start time, then the time of the latest distribution
    pub last_distribution_at: u64,
    /// Deposits collected this round and not yet paid out
    pub pool_balance: i128,
    /// Number of distributions completed
    pub round_index: u32,
    pub enrolled_count: u32,
    pub deposits_this_round: u32,
}

impl CircleState {
    pub fn is_active(&self) -> bool {
        self.status == CircleStatus::Active
    }

    pub fn is_complete(&self) -> bool {
        self.status == CircleStatus::Complete
    }

    pub fn first_round_in_progress(&self) -> bool {
        self.is_active() && self.round_index == 0
    }

    /// Every enrolled participant has deposited this round and the circle
    /// has at least `required_participants` members, so the queue holds a
    /// winner for every remaining round.
    pub fn ready_to_distribute(&self, required_participants: u32) -> bool {
        self.enrolled_count >= required_participants
            && self.deposits_this_round == self.enrolled_count
    }
}

/// Per-identity status flags.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Participant {
    pub enrolled: bool,
    pub has_deposited_this_round: bool,
    pub has_won: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutRecord {
    pub round: u32,
    pub winner: Address,
    pub amount: i128,
    pub paid_at: u64,
}

/// Outcome of an accepted deposit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositReceipt {
    /// The depositor was appended to the payout queue
    pub first_deposit: bool,
    pub pool_balance: i128,
}

/// Outcome of a distribution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Distribution {
    pub payout: PayoutRecord,
    /// This payout was the last one; the circle is now complete
    pub completed: bool,
}

#[derive(Clone)]
pub struct Circle {
    pub config: CircleConfig,
    pub state: CircleState,
    pub participants: Map<Address, Participant>,
    /// Identities in order of their first-ever deposit
    pub deposit_order: Vec<Address>,
    pub payouts: Vec<PayoutRecord>,
}

impl Circle {
    /// Validate the parameters and build an idle circle.
    pub fn configure(
        env: &Env,
        owner: Address,
        token: Address,
        deposit_amount: i128,
        round_length: u64,
        required_participants: u32,
        policy: CirclePolicy,
    ) -> Result<Self, CircleError> {
        if deposit_amount <= 0 || round_length == 0 || required_participants == 0 {
            return Err(CircleError::InvalidConfiguration);
        }
        // A full round must fit in the pool accumulator.
        if deposit_amount
            .checked_mul(required_participants as i128)
            .is_none()
        {
            return Err(CircleError::InvalidConfiguration);
        }

        Ok(Self {
            config: CircleConfig {
                owner,
                token,
                deposit_amount,
                round_length,
                required_participants,
                policy,
            },
            state: CircleState {
                status: CircleStatus::Configured,
                last_distribution_at: 0,
                pool_balance: 0,
                round_index: 0,
                enrolled_count: 0,
                deposits_this_round: 0,
            },
            participants: Map::new(env),
            deposit_order: Vec::new(env),
            payouts: Vec::new(env),
        })
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn clock(&self) -> RoundClock {
        RoundClock::new(self.config.round_length, self.state.last_distribution_at)
    }

    pub fn ready_to_distribute(&self) -> bool {
        self.state
            .ready_to_distribute(self.config.required_participants)
    }

    /// Recipient of the current round, once they have joined the queue.
    pub fn current_winner(&self) -> Option<Address> {
        if !self.is_active() {
            return None;
        }
        self.deposit_order.get(self.state.round_index)
    }

    /// Activate the circle and anchor the round clock at `now`.
    pub fn start(&mut self, caller: &Address, now: u64) -> Result<(), CircleError> {
        access::require_owner(&self.config, caller)?;
        match self.state.status {
            CircleStatus::Active => return Err(CircleError::AlreadyActive),
            CircleStatus::Complete => return Err(CircleError::CircleComplete),
            CircleStatus::Configured => {}
        }

        self.state.status = CircleStatus::Active;
        self.state.last_distribution_at = now;
        Ok(())
    }

    pub fn enroll(&mut self, caller: &Address, identity: &Address) -> Result<(), CircleError> {
        access::require_owner(&self.config, caller)?;
        if !self.is_active() {
            return Err(CircleError::NotStarted);
        }
        if self.participants.contains_key(identity.clone()) {
            return Err(CircleError::AlreadyEnrolled);
        }
        if self.config.policy.enrollment_cap == EnrollmentCap::Capped
            && self.state.enrolled_count >= self.config.required_participants
        {
            return Err(CircleError::CircleFull);
        }
        let enrolled_count = self
            .state
            .enrolled_count
            .checked_add(1)
            .ok_or(CircleError::Overflow)?;

        self.participants.set(
            identity.clone(),
            Participant {
                enrolled: true,
                has_deposited_this_round: false,
                has_won: false,
            },
        );
        self.state.enrolled_count = enrolled_count;
        Ok(())
    }

    /// Record one participant's contribution for the current round.
    ///
    /// A repeated deposit within a round is rejected as `AlreadyDeposited`
    /// whatever the amount.
    pub fn deposit(
        &mut self,
        identity: &Address,
        amount: i128,
    ) -> Result<DepositReceipt, CircleError> {
        if !self.is_active() {
            return Err(CircleError::NotStarted);
        }
        let mut record = access::require_enrolled(&self.participants, identity)?;
        if record.has_deposited_this_round {
            return Err(CircleError::AlreadyDeposited);
        }
        if amount != self.config.deposit_amount {
            return Err(CircleError::WrongAmount);
        }
        let pool_balance = self
            .state
            .pool_balance
            .checked_add(amount)
            .ok_or(CircleError::Overflow)?;
        let deposits_this_round = self
            .state
            .deposits_this_round
            .checked_add(1)
            .ok_or(CircleError::Overflow)?;
        let first_deposit = !self.deposit_order.contains(identity);

        record.has_deposited_this_round = true;
        self.participants.set(identity.clone(), record);
        if first_deposit {
            self.deposit_order.push_back(identity.clone());
        }
        self.state.pool_balance = pool_balance;
        self.state.deposits_this_round = deposits_this_round;

        Ok(DepositReceipt {
            first_deposit,
            pool_balance,
        })
    }

    /// Pay the whole pool to the current round's winner and open the next
    /// round, or complete the circle after the last one.
    pub fn distribute(&mut self, caller: &Address, now: u64) -> Result<Distribution, CircleError> {
        if !self.is_active() {
            return Err(CircleError::NotStarted);
        }
        access::require_distributor(
            self.config.policy.distribute_access,
            &self.participants,
            caller,
        )?;
        if !self.ready_to_distribute() {
            return Err(CircleError::RoundIncomplete);
        }
        if !self.clock().has_elapsed(now) {
            return Err(CircleError::RoundNotElapsed);
        }

        // Readiness guarantees a queued, unpaid winner; anything else means
        // the stored aggregate is inconsistent.
        let winner = self
            .deposit_order
            .get(self.state.round_index)
            .ok_or(CircleError::StorageCorrupted)?;
        let winner_record = self
            .participants
            .get(winner.clone())
            .ok_or(CircleError::StorageCorrupted)?;
        if winner_record.has_won {
            return Err(CircleError::StorageCorrupted);
        }
        let round_index = self
            .state
            .round_index
            .checked_add(1)
            .ok_or(CircleError::Overflow)?;

        let mut participants = self.participants.clone();
        for (identity, mut record) in self.participants.iter() {
            record.has_deposited_this_round = false;
            if identity == winner {
                record.has_won = true;
            }
            participants.set(identity, record);
        }

        let payout = PayoutRecord {
            round: self.state.round_index,
            winner,
            amount: self.state.pool_balance,
            paid_at: now,
        };
        self.payouts.push_back(payout.clone());
        self.participants = participants;
        self.state.pool_balance = 0;
        self.state.deposits_this_round = 0;
        self.state.last_distribution_at = now;
        self.state.round_index = round_index;

        let completed = round_index == self.config.required_participants;
        if completed {
            self.state.status = CircleStatus::Complete;
        }

        Ok(Distribution { payout, completed })
    }
}
