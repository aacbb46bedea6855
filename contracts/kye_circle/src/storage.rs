use soroban_sdk::{contracttype, Address, Env, IntoVal, Map, TryFromVal, Val, Vec};

use crate::circle::{Circle, CircleConfig, CircleState, Participant, PayoutRecord};
use crate::error::CircleError;

const INSTANCE_TTL_THRESHOLD: u32 = 100;
const INSTANCE_TTL_EXTEND: u32 = 500;
const PERSISTENT_TTL_THRESHOLD: u32 = 100;
const PERSISTENT_TTL_EXTEND: u32 = 1000;

/// Storage keys for the contract.
///
/// `Config` and `State` are small and fixed-size and live in instance
/// storage. The member collections grow with the circle and live in
/// persistent storage, one entry each.
#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Immutable circle configuration
    Config,
    /// Round state: status, clock anchor, pool and counters
    State,
    /// Map<Address, Participant>
    Participants,
    /// Vec<Address> in order of first deposit
    DepositOrder,
    /// Vec<PayoutRecord>, one per completed round
    Payouts,
}

// --- Instance ---

pub fn has_config(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn get_config(env: &Env) -> Result<CircleConfig, CircleError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(CircleError::NotInitialized)
}

pub fn get_state(env: &Env) -> Result<CircleState, CircleError> {
    if !has_config(env) {
        return Err(CircleError::NotInitialized);
    }
    env.storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(CircleError::StorageCorrupted)
}

// --- Persistent ---

pub fn get_participants(env: &Env) -> Map<Address, Participant> {
    get_persistent(env, &DataKey::Participants).unwrap_or(Map::new(env))
}

pub fn get_deposit_order(env: &Env) -> Vec<Address> {
    get_persistent(env, &DataKey::DepositOrder).unwrap_or(Vec::new(env))
}

pub fn get_payouts(env: &Env) -> Vec<PayoutRecord> {
    get_persistent(env, &DataKey::Payouts).unwrap_or(Vec::new(env))
}

// --- Aggregate ---

pub fn load_circle(env: &Env) -> Result<Circle, CircleError> {
    Ok(Circle {
        config: get_config(env)?,
        state: get_state(env)?,
        participants: get_participants(env),
        deposit_order: get_deposit_order(env),
        payouts: get_payouts(env),
    })
}

/// Write the whole aggregate back. Called only after an operation succeeded.
pub fn save_circle(env: &Env, circle: &Circle) {
    env.storage().instance().set(&DataKey::Config, &circle.config);
    env.storage().instance().set(&DataKey::State, &circle.state);
    extend_instance_ttl(env);

    set_persistent(env, &DataKey::Participants, &circle.participants);
    set_persistent(env, &DataKey::DepositOrder, &circle.deposit_order);
    set_persistent(env, &DataKey::Payouts, &circle.payouts);
}

fn get_persistent<V>(env: &Env, key: &DataKey) -> Option<V>
where
    V: TryFromVal<Env, Val>,
{
    let result = env.storage().persistent().get(key);
    if result.is_some() {
        extend_persistent_ttl(env, key);
    }
    result
}

fn set_persistent<V>(env: &Env, key: &DataKey, value: &V)
where
    V: IntoVal<Env, Val>,
{
    env.storage().persistent().set(key, value);
    extend_persistent_ttl(env, key);
}

// --- TTL Management ---

fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND);
}

fn extend_persistent_ttl(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
}
