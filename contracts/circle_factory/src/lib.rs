#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, Address, BytesN, Env, Vec,
};

const INSTANCE_TTL_THRESHOLD: u32 = 100;
const INSTANCE_TTL_EXTEND: u32 = 500;
const PERSISTENT_TTL_THRESHOLD: u32 = 100;
const PERSISTENT_TTL_EXTEND: u32 = 1000;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FactoryError {
    /// Factory already initialized
    AlreadyInitialized = 1,
    /// Factory not initialized
    NotInitialized = 2,
    /// Only admin can perform this action
    Unauthorized = 3,
    /// No circle at the requested index
    CircleNotFound = 4,
}

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Admin address (can replace the circle WASM and token)
    Admin,
    /// WASM hash of the kye_circle contract
    CircleWasmHash,
    /// Number of deployed circles
    CircleCount,
    /// Address of the circle deployed at this index (persistent)
    Circle(u32),
    /// Token used by newly deployed circles
    Token,
}

// Mirrors of the kye_circle constructor types. Contract values are encoded
// by shape, so these pass through to the circle's constructor unchanged.

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DistributeAccess {
    Anyone = 0,
    Enrolled = 1,
}

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

/// Constructor arguments of a kye_circle contract, in declaration order.
type CircleArgs = (Address, Address, i128, u64, u32, CirclePolicy);

fn circle_args(
    owner: Address,
    token: Address,
    deposit_amount: i128,
    round_length: u64,
    required_participants: u32,
    policy: CirclePolicy,
) -> CircleArgs {
    (
        owner,
        token,
        deposit_amount,
        round_length,
        required_participants,
        policy,
    )
}

/// Circle Factory Contract
///
/// Deploys and tracks kye circle contracts.
/// Each circle is a separate contract instance with its own pool and members.
#[contract]
pub struct CircleFactory;

#[contractimpl]
impl CircleFactory {
    /// Initialize the factory.
    ///
    /// # Arguments
    /// * `admin` - Address that can update factory settings
    /// * `circle_wasm_hash` - WASM hash of the kye_circle contract
    /// * `token` - Token used for deposits in new circles
    pub fn initialize(
        env: Env,
        admin: Address,
        circle_wasm_hash: BytesN<32>,
        token: Address,
    ) -> Result<(), FactoryError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(FactoryError::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::CircleWasmHash, &circle_wasm_hash);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::CircleCount, &0u32);
        extend_instance_ttl(&env);

        Ok(())
    }

    /// Deploy a new circle owned by `owner`.
    ///
    /// # Arguments
    /// * `owner` - Owner of the new circle (starts it, enrolls members)
    /// * `deposit_amount` - Exact per-round deposit
    /// * `round_length` - Minimum seconds between distributions
    /// * `required_participants` - Members and rounds in the circle
    /// * `policy` - Distribution access and enrollment cap
    /// * `salt` - Unique salt for deterministic address generation
    ///
    /// # Returns
    /// Address of the deployed circle contract
    pub fn deploy_circle(
        env: Env,
        owner: Address,
        deposit_amount: i128,
        round_length: u64,
        required_participants: u32,
        policy: CirclePolicy,
        salt: BytesN<32>,
    ) -> Result<Address, FactoryError> {
        Self::require_initialized(&env)?;

        owner.require_auth();

        let wasm_hash: BytesN<32> = env
            .storage()
            .instance()
            .get(&DataKey::CircleWasmHash)
            .ok_or(FactoryError::NotInitialized)?;
        let token: Address = env
            .storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(FactoryError::NotInitialized)?;

        // The circle's constructor validates the parameters and traps on
        // invalid ones, which aborts this deployment as well.
        let circle_address = env.deployer().with_current_contract(salt).deploy_v2(
            wasm_hash,
            circle_args(
                owner.clone(),
                token,
                deposit_amount,
                round_length,
                required_participants,
                policy,
            ),
        );

        let index = record_circle(&env, &circle_address)?;

        log!(&env, "circle deployed", circle_address, owner, index);

        Ok(circle_address)
    }

    /// Get all deployed circle addresses.
    pub fn list_circles(env: Env) -> Result<Vec<Address>, FactoryError> {
        Self::require_initialized(&env)?;
        let mut circles = Vec::new(&env);
        for index in 0..registry_len(&env)? {
            circles.push_back(circle_at(&env, index)?);
        }
        Ok(circles)
    }

    /// Get the number of deployed circles.
    pub fn circle_count(env: Env) -> Result<u32, FactoryError> {
        Self::require_initialized(&env)?;
        registry_len(&env)
    }

    /// Get a circle address by index.
    pub fn get_circle(env: Env, index: u32) -> Result<Address, FactoryError> {
        Self::require_initialized(&env)?;
        if index >= registry_len(&env)? {
            return Err(FactoryError::CircleNotFound);
        }
        circle_at(&env, index)
    }

    /// Get the admin address.
    pub fn get_admin(env: Env) -> Result<Address, FactoryError> {
        Self::require_initialized(&env)?;
        Self::admin(&env)
    }

    /// Get the circle WASM hash.
    pub fn get_circle_wasm_hash(env: Env) -> Result<BytesN<32>, FactoryError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::CircleWasmHash)
            .ok_or(FactoryError::NotInitialized)
    }

    /// Get the token used by new circles.
    pub fn get_token(env: Env) -> Result<Address, FactoryError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(FactoryError::NotInitialized)
    }

    /// Update the circle WASM hash (admin only). Existing circles are unaffected.
    pub fn set_circle_wasm_hash(
        env: Env,
        admin: Address,
        new_wasm_hash: BytesN<32>,
    ) -> Result<(), FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::CircleWasmHash, &new_wasm_hash);

        Ok(())
    }

    /// Update the token used by new circles (admin only).
    pub fn set_token(env: Env, admin: Address, new_token: Address) -> Result<(), FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage().instance().set(&DataKey::Token, &new_token);

        Ok(())
    }

    // --- Internal helpers ---

    fn require_initialized(env: &Env) -> Result<(), FactoryError> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(FactoryError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), FactoryError> {
        if *caller != Self::admin(env)? {
            return Err(FactoryError::Unauthorized);
        }
        Ok(())
    }

    fn admin(env: &Env) -> Result<Address, FactoryError> {
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(FactoryError::NotInitialized)
    }
}

// --- Circle registry ---

fn registry_len(env: &Env) -> Result<u32, FactoryError> {
    env.storage()
        .instance()
        .get(&DataKey::CircleCount)
        .ok_or(FactoryError::NotInitialized)
}

fn circle_at(env: &Env, index: u32) -> Result<Address, FactoryError> {
    let key = DataKey::Circle(index);
    let address = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(FactoryError::CircleNotFound)?;
    extend_persistent_ttl(env, &key);
    Ok(address)
}

/// Append a deployed circle to the registry and return its index.
fn record_circle(env: &Env, circle_address: &Address) -> Result<u32, FactoryError> {
    let index = registry_len(env)?;
    let key = DataKey::Circle(index);
    env.storage().persistent().set(&key, circle_address);
    extend_persistent_ttl(env, &key);
    env.storage()
        .instance()
        .set(&DataKey::CircleCount, &(index + 1));
    extend_instance_ttl(env);
    Ok(index)
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

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::{testutils::Address as _, Env};

    /// Register and initialize a factory.
    /// Returns (env, client, admin, wasm_hash, token)
    fn setup_factory() -> (Env, CircleFactoryClient<'static>, Address, BytesN<32>, Address) {
        let env = Env::default();
        env.mock_all_auths();

        let contract_id = env.register(CircleFactory, ());
        let client = CircleFactoryClient::new(&env, &contract_id);

        let admin = Address::generate(&env);
        let wasm_hash = BytesN::from_array(&env, &[0u8; 32]);
        let token = Address::generate(&env);

        client.initialize(&admin, &wasm_hash, &token);

        (env, client, admin, wasm_hash, token)
    }

    #[test]
    fn test_initialize() {
        let (_env, client, admin, wasm_hash, token) = setup_factory();

        assert_eq!(client.get_admin(), admin);
        assert_eq!(client.get_circle_wasm_hash(), wasm_hash);
        assert_eq!(client.get_token(), token);
        assert_eq!(client.circle_count(), 0);
        assert_eq!(client.list_circles().len(), 0);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #1)")] // AlreadyInitialized = 1
    fn test_double_initialize() {
        let (_env, client, admin, wasm_hash, token) = setup_factory();

        client.initialize(&admin, &wasm_hash, &token);
    }

    #[test]
    fn test_reads_before_initialize_fail() {
        let env = Env::default();
        let contract_id = env.register(CircleFactory, ());
        let client = CircleFactoryClient::new(&env, &contract_id);

        assert_eq!(client.try_circle_count(), Err(Ok(FactoryError::NotInitialized)));
        assert_eq!(client.try_get_admin(), Err(Ok(FactoryError::NotInitialized)));
    }

    #[test]
    fn test_get_circle_out_of_range() {
        let (_env, client, _admin, _wasm_hash, _token) = setup_factory();

        assert_eq!(client.try_get_circle(&0), Err(Ok(FactoryError::CircleNotFound)));
    }

    #[test]
    fn test_admin_updates_settings() {
        let (env, client, admin, _wasm_hash, _token) = setup_factory();

        let new_hash = BytesN::from_array(&env, &[7u8; 32]);
        let new_token = Address::generate(&env);
        client.set_circle_wasm_hash(&admin, &new_hash);
        client.set_token(&admin, &new_token);

        assert_eq!(client.get_circle_wasm_hash(), new_hash);
        assert_eq!(client.get_token(), new_token);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #3)")] // Unauthorized = 3
    fn test_set_wasm_hash_by_non_admin_fails() {
        let (env, client, _admin, _wasm_hash, _token) = setup_factory();

        let stranger = Address::generate(&env);
        client.set_circle_wasm_hash(&stranger, &BytesN::from_array(&env, &[1u8; 32]));
    }

    #[test]
    fn test_set_token_by_non_admin_fails() {
        let (env, client, _admin, _wasm_hash, token) = setup_factory();

        let stranger = Address::generate(&env);
        assert_eq!(
            client.try_set_token(&stranger, &Address::generate(&env)),
            Err(Ok(FactoryError::Unauthorized))
        );
        assert_eq!(client.get_token(), token);
    }

    fn policy(distribute_access: DistributeAccess, enrollment_cap: EnrollmentCap) -> CirclePolicy {
        CirclePolicy {
            distribute_access,
            enrollment_cap,
        }
    }

    /// Register a kye_circle natively with the arguments the factory would
    /// pass to its constructor.
    fn register_circle(
        env: &Env,
        owner: &Address,
        token: &Address,
        required_participants: u32,
        policy: CirclePolicy,
    ) -> Address {
        env.register(
            kye_circle::KyeCircle,
            circle_args(
                owner.clone(),
                token.clone(),
                10_000_000,
                604_800,
                required_participants,
                policy,
            ),
        )
    }

    #[test]
    fn test_circle_args_accepted_by_circle_constructor() {
        let (env, _client, _admin, _wasm_hash, token) = setup_factory();
        let owner = Address::generate(&env);

        let circle_id = register_circle(
            &env,
            &owner,
            &token,
            5,
            policy(DistributeAccess::Enrolled, EnrollmentCap::Uncapped),
        );
        let circle = kye_circle::KyeCircleClient::new(&env, &circle_id);

        assert_eq!(circle.get_owner(), owner);
        assert_eq!(circle.get_token(), token);
        assert_eq!(circle.deposit_amount(), 10_000_000);
        assert_eq!(circle.round_length(), 604_800);
        assert_eq!(circle.required_participants(), 5);
        assert_eq!(
            circle.get_policy(),
            kye_circle::CirclePolicy {
                distribute_access: kye_circle::DistributeAccess::Enrolled,
                enrollment_cap: kye_circle::EnrollmentCap::Uncapped,
            }
        );
    }

    #[test]
    fn test_registry_tracks_circles_in_order() {
        let (env, client, _admin, _wasm_hash, token) = setup_factory();
        let first_owner = Address::generate(&env);
        let second_owner = Address::generate(&env);

        let first = register_circle(
            &env,
            &first_owner,
            &token,
            10,
            policy(DistributeAccess::Anyone, EnrollmentCap::Capped),
        );
        let second = register_circle(
            &env,
            &second_owner,
            &token,
            3,
            policy(DistributeAccess::Enrolled, EnrollmentCap::Uncapped),
        );

        env.as_contract(&client.address, || {
            assert_eq!(record_circle(&env, &first), Ok(0));
            assert_eq!(record_circle(&env, &second), Ok(1));
        });

        assert_eq!(client.circle_count(), 2);
        assert_eq!(client.get_circle(&0), first);
        assert_eq!(client.get_circle(&1), second);
        assert_eq!(
            client.list_circles(),
            Vec::from_array(&env, [first.clone(), second.clone()])
        );
        assert_eq!(client.try_get_circle(&2), Err(Ok(FactoryError::CircleNotFound)));

        let first_circle = kye_circle::KyeCircleClient::new(&env, &client.get_circle(&0));
        assert_eq!(first_circle.get_owner(), first_owner);
        assert_eq!(
            first_circle.get_policy().enrollment_cap,
            kye_circle::EnrollmentCap::Capped
        );

        let second_circle = kye_circle::KyeCircleClient::new(&env, &client.get_circle(&1));
        assert_eq!(second_circle.get_owner(), second_owner);
        assert_eq!(second_circle.required_participants(), 3);
        assert_eq!(
            second_circle.get_policy().distribute_access,
            kye_circle::DistributeAccess::Enrolled
        );
    }

    #[test]
    fn test_failed_deploy_leaves_registry_unchanged() {
        let (env, client, _admin, _wasm_hash, _token) = setup_factory();

        // No circle WASM is uploaded under the configured hash.
        let result = client.try_deploy_circle(
            &Address::generate(&env),
            &10_000_000,
            &604_800,
            &10,
            &policy(DistributeAccess::Anyone, EnrollmentCap::Capped),
            &BytesN::from_array(&env, &[3u8; 32]),
        );

        assert!(result.is_err());
        assert_eq!(client.circle_count(), 0);
        assert_eq!(client.list_circles().len(), 0);
    }

    #[test]
    fn test_deploy_before_initialize_fails() {
        let env = Env::default();
        env.mock_all_auths();
        let contract_id = env.register(CircleFactory, ());
        let client = CircleFactoryClient::new(&env, &contract_id);

        let result = client.try_deploy_circle(
            &Address::generate(&env),
            &10_000_000,
            &604_800,
            &10,
            &policy(DistributeAccess::Anyone, EnrollmentCap::Capped),
            &BytesN::from_array(&env, &[2u8; 32]),
        );
        assert_eq!(result, Err(Ok(FactoryError::NotInitialized)));
    }
}
