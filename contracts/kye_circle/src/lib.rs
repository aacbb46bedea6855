#![no_std]

mod access;
mod circle;
mod clock;
mod error;
mod events;
mod storage;

use circle::Circle;
use clock::RoundClock;
use soroban_sdk::{contract, contractimpl, log, token, Address, Env, Vec};

pub use circle::{
    CircleConfig, CirclePolicy, CircleState, CircleStatus, DistributeAccess, EnrollmentCap,
    Participant, PayoutRecord,
};
pub use error::CircleError;

/// Kye Circle Contract
///
/// A rotating savings circle: every enrolled participant deposits the same
/// amount each round, and the whole pool of the round goes to one of them.
/// Payout order is the order of first deposits, so after N rounds each of the
/// N participants has been paid exactly once.
///
/// Lifecycle:
/// - Owner deploys (configures) and starts the circle, then enrolls members
/// - Members deposit once per round; the token is held by this contract
/// - When everyone has deposited and `round_length` has passed since the
///   previous payout, `distribute` pays the pool to the round's winner
/// - After the last round the circle is complete and accepts nothing more
#[contract]
pub struct KyeCircle;

#[contractimpl]
impl KyeCircle {
    /// Constructor: called automatically on deployment (directly or via the factory).
    ///
    /// Delegates to initialize() for the actual setup logic.
    pub fn __constructor(
        env: Env,
        owner: Address,
        token: Address,
        deposit_amount: i128,
        round_length: u64,
        required_participants: u32,
        policy: CirclePolicy,
    ) {
        Self::initialize(
            env,
            owner,
            token,
            deposit_amount,
            round_length,
            required_participants,
            policy,
        )
        .expect("initialization failed");
    }

    /// Configure the circle.
    ///
    /// # Arguments
    /// * `owner` - Address allowed to start the circle and enroll members
    /// * `token` - Token contract used for deposits and payouts
    /// * `deposit_amount` - Exact amount each member deposits per round
    /// * `round_length` - Minimum seconds between two distributions
    /// * `required_participants` - Number of members, and of rounds
    /// * `policy` - Who may distribute, and whether enrollment is capped
    pub fn initialize(
        env: Env,
        owner: Address,
        token: Address,
        deposit_amount: i128,
        round_length: u64,
        required_participants: u32,
        policy: CirclePolicy,
    ) -> Result<(), CircleError> {
        if storage::has_config(&env) {
            return Err(CircleError::AlreadyInitialized);
        }

        let circle = Circle::configure(
            &env,
            owner.clone(),
            token,
            deposit_amount,
            round_length,
            required_participants,
            policy,
        )?;

        owner.require_auth();

        storage::save_circle(&env, &circle);
        log!(
            &env,
            "circle configured",
            deposit_amount,
            round_length,
            required_participants
        );

        Ok(())
    }

    /// Start the circle (owner only). The first round's clock starts now.
    pub fn start(env: Env, owner: Address) -> Result<(), CircleError> {
        let mut circle = storage::load_circle(&env)?;
        let now = env.ledger().timestamp();

        circle.start(&owner, now)?;
        owner.require_auth();

        storage::save_circle(&env, &circle);
        events::started(&env, now);
        log!(&env, "circle started", now);

        Ok(())
    }

    /// Enroll a participant (owner only, circle must be active).
    pub fn enroll(env: Env, owner: Address, identity: Address) -> Result<(), CircleError> {
        let mut circle = storage::load_circle(&env)?;

        circle.enroll(&owner, &identity)?;
        owner.require_auth();

        storage::save_circle(&env, &circle);
        events::enrolled(&env, &identity);
        log!(&env, "participant enrolled", identity, circle.state.enrolled_count);

        Ok(())
    }

    /// Deposit this round's contribution.
    ///
    /// # Arguments
    /// * `identity` - Enrolled participant (must authorize)
    /// * `amount` - Must equal the configured deposit amount
    ///
    /// # Returns
    /// Pool balance after the deposit
    pub fn deposit(env: Env, identity: Address, amount: i128) -> Result<i128, CircleError> {
        let mut circle = storage::load_circle(&env)?;

        let receipt = circle.deposit(&identity, amount)?;
        identity.require_auth();

        // Note: token_client.transfer() panics when the participant cannot pay;
        // the whole invocation is rolled back in that case.
        let token_client = token::Client::new(&env, &circle.config.token);
        token_client.transfer(&identity, &env.current_contract_address(), &amount);

        storage::save_circle(&env, &circle);
        events::deposit(&env, &identity, amount);
        log!(
            &env,
            "deposit accepted",
            identity,
            amount,
            receipt.pool_balance,
            receipt.first_deposit
        );

        Ok(receipt.pool_balance)
    }

    /// Pay the round's pool to its winner.
    ///
    /// Requires every enrolled member to have deposited and `round_length`
    /// seconds since the previous distribution (or the start). With the
    /// `Enrolled` distribution policy the caller must be a member.
    ///
    /// # Returns
    /// The payout that was made
    pub fn distribute(env: Env, caller: Address) -> Result<PayoutRecord, CircleError> {
        let mut circle = storage::load_circle(&env)?;
        let now = env.ledger().timestamp();

        let distribution = circle.distribute(&caller, now)?;
        caller.require_auth();

        storage::save_circle(&env, &circle);

        let payout = distribution.payout;
        let token_client = token::Client::new(&env, &circle.config.token);
        token_client.transfer(&env.current_contract_address(), &payout.winner, &payout.amount);

        events::distribution_pool(&env, &payout.winner, payout.amount);
        log!(
            &env,
            "pool distributed",
            payout.round,
            payout.winner,
            payout.amount
        );

        if distribution.completed {
            events::complete(&env, circle.state.round_index);
            log!(&env, "circle complete", circle.state.round_index);
        }

        Ok(payout)
    }

    // --- Reads ---

    /// Deposits collected this round and not yet paid out.
    pub fn pool_balance(env: Env) -> Result<i128, CircleError> {
        Ok(storage::get_state(&env)?.pool_balance)
    }

    /// Number of distributions completed so far.
    pub fn round_index(env: Env) -> Result<u32, CircleError> {
        Ok(storage::get_state(&env)?.round_index)
    }

    pub fn ready_to_distribute(env: Env) -> Result<bool, CircleError> {
        let config = storage::get_config(&env)?;
        let state = storage::get_state(&env)?;
        Ok(state.ready_to_distribute(config.required_participants))
    }

    pub fn is_active(env: Env) -> Result<bool, CircleError> {
        Ok(storage::get_state(&env)?.is_active())
    }

    pub fn is_complete(env: Env) -> Result<bool, CircleError> {
        Ok(storage::get_state(&env)?.is_complete())
    }

    pub fn first_round_in_progress(env: Env) -> Result<bool, CircleError> {
        Ok(storage::get_state(&env)?.first_round_in_progress())
    }

    pub fn enrolled_count(env: Env) -> Result<u32, CircleError> {
        Ok(storage::get_state(&env)?.enrolled_count)
    }

    /// Full round state snapshot.
    pub fn get_state(env: Env) -> Result<CircleState, CircleError> {
        storage::get_state(&env)
    }

    pub fn get_config(env: Env) -> Result<CircleConfig, CircleError> {
        storage::get_config(&env)
    }

    pub fn deposit_amount(env: Env) -> Result<i128, CircleError> {
        Ok(storage::get_config(&env)?.deposit_amount)
    }

    pub fn round_length(env: Env) -> Result<u64, CircleError> {
        Ok(storage::get_config(&env)?.round_length)
    }

    pub fn required_participants(env: Env) -> Result<u32, CircleError> {
        Ok(storage::get_config(&env)?.required_participants)
    }

    pub fn get_owner(env: Env) -> Result<Address, CircleError> {
        Ok(storage::get_config(&env)?.owner)
    }

    pub fn get_token(env: Env) -> Result<Address, CircleError> {
        Ok(storage::get_config(&env)?.token)
    }

    pub fn get_policy(env: Env) -> Result<CirclePolicy, CircleError> {
        Ok(storage::get_config(&env)?.policy)
    }

    /// Status flags of an identity, or None if it was never enrolled.
    pub fn get_participant(env: Env, identity: Address) -> Result<Option<Participant>, CircleError> {
        storage::get_config(&env)?;
        Ok(storage::get_participants(&env).get(identity))
    }

    /// Payout queue: members in order of their first deposit.
    pub fn get_deposit_order(env: Env) -> Result<Vec<Address>, CircleError> {
        storage::get_config(&env)?;
        Ok(storage::get_deposit_order(&env))
    }

    pub fn deposit_order_at(env: Env, index: u32) -> Result<Option<Address>, CircleError> {
        storage::get_config(&env)?;
        Ok(storage::get_deposit_order(&env).get(index))
    }

    /// Recipient of the current round, if already known.
    pub fn current_winner(env: Env) -> Result<Option<Address>, CircleError> {
        Ok(storage::load_circle(&env)?.current_winner())
    }

    pub fn last_distribution_at(env: Env) -> Result<u64, CircleError> {
        Ok(storage::get_state(&env)?.last_distribution_at)
    }

    /// Earliest ledger timestamp at which the current round can be distributed.
    pub fn next_distribution_at(env: Env) -> Result<u64, CircleError> {
        let config = storage::get_config(&env)?;
        let state = storage::get_state(&env)?;
        Ok(RoundClock::new(config.round_length, state.last_distribution_at).next_distribution_at())
    }

    /// Seconds until the current round can be distributed (0 once elapsed).
    pub fn time_until_distribution(env: Env) -> Result<u64, CircleError> {
        let config = storage::get_config(&env)?;
        let state = storage::get_state(&env)?;
        let clock = RoundClock::new(config.round_length, state.last_distribution_at);
        Ok(clock.remaining(env.ledger().timestamp()))
    }

    /// All payouts made so far, oldest first.
    pub fn get_payout_history(env: Env) -> Result<Vec<PayoutRecord>, CircleError> {
        storage::get_config(&env)?;
        Ok(storage::get_payouts(&env))
    }
}
