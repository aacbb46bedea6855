//! Contract events, published after the engine has committed a transition.
//!
//! Topic is a single short symbol; the data tuple carries the details.

use soroban_sdk::{symbol_short, Address, Env};

pub fn started(env: &Env, started_at: u64) {
    env.events()
        .publish((symbol_short!("started"),), started_at);
}

pub fn enrolled(env: &Env, identity: &Address) {
    env.events()
        .publish((symbol_short!("enrolled"),), identity.clone());
}

pub fn deposit(env: &Env, identity: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("deposit"),), (identity.clone(), amount));
}

pub fn distribution_pool(env: &Env, winner: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("dist_pool"),), (winner.clone(), amount));
}

pub fn complete(env: &Env, rounds: u32) {
    env.events().publish((symbol_short!("complete"),), rounds);
}
