#![no_std]

mod accrual;
mod escrow;
mod registry;

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, Address, Env, Vec};

pub use escrow::EscrowAccount;
pub use registry::{Registry, UpsertOutcome};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Global configuration: the native asset's Stellar Asset Contract.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub token: Address,
}

/// Lifecycle of a stream. There is no terminal state.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamStatus {
    Pending = 0,
    Active = 1,
}

#[soroban_sdk::contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    SenderEqualsReceiver = 1,
    InvalidLength = 2,
    RegistryNotFound = 3,
    StreamNotFound = 4,
    StreamAlreadyActive = 5,
    UnauthorizedCaller = 6,
    InvalidAmount = 7,
    NotInitialized = 8,
    AlreadyInitialized = 9,
    BalanceOverflow = 10,
    InsufficientEscrow = 11,
}

/// Event payloads. Topics are `(name, sender, receiver)`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StreamEvent {
    /// New record: `(deposit_amount, length_in_seconds)`.
    Created(i128, u64),
    /// Existing record overwritten: `(deposit_amount, length_in_seconds)`.
    Restarted(i128, u64),
    /// Acceptance time.
    Accepted(u64),
    /// Amount paid to the receiver.
    Claimed(i128),
    /// Amount refunded to the sender.
    Cancelled(i128),
}

/// One sender → receiver vesting arrangement, stored in the sender's registry.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stream {
    pub sender: Address,
    pub receiver: Address,
    pub length_in_seconds: u64,
    /// Creation time while pending, acceptance time once active, 0 after cancel.
    pub start_time: u64,
    pub status: StreamStatus,
}

impl Stream {
    /// Origin of the vesting schedule. Pending streams vest from epoch 0.
    pub fn vesting_start(&self) -> u64 {
        match self.status {
            StreamStatus::Active => self.start_time,
            StreamStatus::Pending => 0,
        }
    }
}

/// Read-only view returned by `get_stream`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamInfo {
    pub length_in_seconds: u64,
    pub start_time: u64,
    /// Pooled escrow balance of the sender, shared by all of their streams.
    pub balance: i128,
}

/// Namespace for all contract storage keys.
#[contracttype]
pub enum DataKey {
    Config,            // Instance storage for the asset address.
    Registry(Address), // Persistent storage, one entry per sender.
}

pub(crate) const TTL_THRESHOLD: u32 = 17280;
pub(crate) const TTL_EXTEND_TO: u32 = 120960;

// ---------------------------------------------------------------------------
// Storage helpers
// ---------------------------------------------------------------------------

fn get_config(env: &Env) -> Result<Config, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(ContractError::NotInitialized)
}

fn get_token(env: &Env) -> Result<Address, ContractError> {
    Ok(get_config(env)?.token)
}

// ---------------------------------------------------------------------------
// Internal Helpers
// ---------------------------------------------------------------------------

impl PooledStream {
    fn require_distinct(sender: &Address, receiver: &Address) -> Result<(), ContractError> {
        if sender == receiver {
            return Err(ContractError::SenderEqualsReceiver);
        }
        Ok(())
    }

    fn validate_stream_params(
        sender: &Address,
        receiver: &Address,
        amount: i128,
        length_in_seconds: u64,
    ) -> Result<(), ContractError> {
        Self::require_distinct(sender, receiver)?;
        if length_in_seconds == 0 {
            return Err(ContractError::InvalidLength);
        }
        if amount < 0 {
            return Err(ContractError::InvalidAmount);
        }
        Ok(())
    }

    fn require_pending(stream: &Stream) -> Result<(), ContractError> {
        if stream.status == StreamStatus::Active {
            return Err(ContractError::StreamAlreadyActive);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Contract Implementation
// ---------------------------------------------------------------------------

#[contract]
pub struct PooledStream;

#[contractimpl]
impl PooledStream {
    /// Initialise the contract with the native asset's token contract.
    ///
    /// Must be called exactly once before any stream is created. The address is
    /// stored in instance storage and used for every deposit, claim and refund.
    ///
    /// # Errors
    /// - `AlreadyInitialized` if called more than once
    pub fn init(env: Env, token: Address) -> Result<(), ContractError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(ContractError::AlreadyInitialized);
        }
        env.storage()
            .instance()
            .set(&DataKey::Config, &Config { token });
        env.storage()
            .instance()
            .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
        Ok(())
    }

    /// Create a stream to `receiver`, or restart the existing one, and deposit
    /// `amount` into the sender's pooled escrow.
    ///
    /// The sender's registry is opened on first use. A new stream starts
    /// `Pending` with `start_time = now`. If a stream to `receiver` already
    /// exists it is overwritten in place: `length_in_seconds` and `start_time`
    /// take the new values and its status is kept, so an accepted stream's
    /// vesting clock restarts. The deposit always lands in the pooled balance,
    /// which every stream of this sender draws from.
    ///
    /// # Authorization
    /// - Requires authorization from `sender`
    ///
    /// # Errors
    /// - `SenderEqualsReceiver`, `InvalidLength` (zero), `InvalidAmount` (negative)
    /// - `NotInitialized`, `BalanceOverflow`
    ///
    /// # Events
    /// - `created(sender, receiver)` with `Created` or `Restarted`
    pub fn create_stream(
        env: Env,
        sender: Address,
        receiver: Address,
        amount: i128,
        length_in_seconds: u64,
    ) -> Result<UpsertOutcome, ContractError> {
        sender.require_auth();
        Self::validate_stream_params(&sender, &receiver, amount, length_in_seconds)?;

        let token = get_token(&env)?;
        let now = env.ledger().timestamp();

        let mut registry = registry::get_or_create(&env, &sender);
        let outcome = registry.upsert_stream(&sender, &receiver, length_in_seconds, now);
        registry.escrow.deposit(&env, &token, &sender, amount)?;
        registry::save_registry(&env, &sender, &registry);

        let event = match outcome {
            UpsertOutcome::Inserted => StreamEvent::Created(amount, length_in_seconds),
            UpsertOutcome::Reset => StreamEvent::Restarted(amount, length_in_seconds),
        };
        env.events()
            .publish((symbol_short!("created"), sender, receiver), event);
        Ok(outcome)
    }

    /// Accept the stream `sender` opened to the caller, starting its vesting clock.
    ///
    /// The stream is looked up by the caller's own address, so only the
    /// receiver can accept it.
    ///
    /// # Authorization
    /// - Requires authorization from `receiver`
    ///
    /// # Errors
    /// - `SenderEqualsReceiver`, `RegistryNotFound`, `StreamNotFound`
    /// - `StreamAlreadyActive` if already accepted
    pub fn accept_stream(
        env: Env,
        receiver: Address,
        sender: Address,
    ) -> Result<(), ContractError> {
        receiver.require_auth();
        Self::require_distinct(&sender, &receiver)?;

        let mut registry = registry::load_registry(&env, &sender)?;
        let mut stream = registry.require_stream(&receiver)?;
        Self::require_pending(&stream)?;

        let now = env.ledger().timestamp();
        stream.status = StreamStatus::Active;
        stream.start_time = now;
        registry.put_stream(stream);
        registry::save_registry(&env, &sender, &registry);

        env.events().publish(
            (symbol_short!("accepted"), sender, receiver),
            StreamEvent::Accepted(now),
        );
        Ok(())
    }

    /// Pay the caller their vested share of the sender's pooled escrow.
    ///
    /// The payout is computed against the balance held right now, so every call
    /// vests a fraction of what is left rather than of the original deposit.
    /// Once the vesting period has elapsed the whole pooled balance is paid.
    /// Pending streams vest from epoch 0 and are not rejected.
    ///
    /// # Returns
    /// - The amount transferred (0 when nothing is claimable; no event then)
    ///
    /// # Authorization
    /// - Requires authorization from `receiver`
    ///
    /// # Errors
    /// - `SenderEqualsReceiver`, `RegistryNotFound`, `StreamNotFound`, `NotInitialized`
    pub fn claim_stream(
        env: Env,
        receiver: Address,
        sender: Address,
    ) -> Result<i128, ContractError> {
        receiver.require_auth();
        Self::require_distinct(&sender, &receiver)?;

        let mut registry = registry::load_registry(&env, &sender)?;
        let stream = registry.require_stream(&receiver)?;

        let amount = accrual::claim_amount(
            registry.escrow.balance(),
            stream.vesting_start(),
            stream.length_in_seconds,
            env.ledger().timestamp(),
        );
        if amount == 0 {
            return Ok(0);
        }

        let token = get_token(&env)?;
        registry.escrow.transfer_out(&env, &token, &receiver, amount)?;
        registry::save_registry(&env, &sender, &registry);

        env.events().publish(
            (symbol_short!("claimed"), sender, receiver),
            StreamEvent::Claimed(amount),
        );
        Ok(amount)
    }

    /// Cancel a pending stream and refund the sender's entire pooled escrow.
    ///
    /// Because the escrow is shared, the refund covers every stream of this
    /// sender, including active ones, not only the cancelled one.
    ///
    /// # Returns
    /// - The amount refunded to `sender`
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, which must be `sender` or `receiver`
    ///
    /// # Errors
    /// - `UnauthorizedCaller`, `RegistryNotFound`, `StreamNotFound`, `NotInitialized`
    /// - `StreamAlreadyActive` once the stream has been accepted
    pub fn cancel_stream(
        env: Env,
        caller: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<i128, ContractError> {
        caller.require_auth();
        if caller != sender && caller != receiver {
            return Err(ContractError::UnauthorizedCaller);
        }

        let mut registry = registry::load_registry(&env, &sender)?;
        let mut stream = registry.require_stream(&receiver)?;
        Self::require_pending(&stream)?;

        stream.start_time = 0;
        registry.put_stream(stream);

        let refund = registry.escrow.balance();
        if refund > 0 {
            let token = get_token(&env)?;
            registry.escrow.transfer_out(&env, &token, &sender, refund)?;
        }
        registry::save_registry(&env, &sender, &registry);

        env.events().publish(
            (symbol_short!("cancelled"), sender, receiver),
            StreamEvent::Cancelled(refund),
        );
        Ok(refund)
    }

    /// Return `(length_in_seconds, start_time, pooled balance)` for a stream.
    ///
    /// `start_time` is 0 for a stream that was cancelled.
    pub fn get_stream(
        env: Env,
        sender: Address,
        receiver: Address,
    ) -> Result<StreamInfo, ContractError> {
        let registry = registry::load_registry(&env, &sender)?;
        let stream = registry.require_stream(&receiver)?;
        Ok(StreamInfo {
            length_in_seconds: stream.length_in_seconds,
            start_time: stream.start_time,
            balance: registry.escrow.balance(),
        })
    }

    /// Retrieve the full stored record of a stream, including its status.
    pub fn get_stream_state(
        env: Env,
        sender: Address,
        receiver: Address,
    ) -> Result<Stream, ContractError> {
        registry::load_registry(&env, &sender)?.require_stream(&receiver)
    }

    pub fn stream_status(
        env: Env,
        sender: Address,
        receiver: Address,
    ) -> Result<StreamStatus, ContractError> {
        Ok(Self::get_stream_state(env, sender, receiver)?.status)
    }

    /// What `claim_stream` would pay the receiver at the current ledger time.
    pub fn claimable_amount(
        env: Env,
        sender: Address,
        receiver: Address,
    ) -> Result<i128, ContractError> {
        let registry = registry::load_registry(&env, &sender)?;
        let stream = registry.require_stream(&receiver)?;
        Ok(accrual::claim_amount(
            registry.escrow.balance(),
            stream.vesting_start(),
            stream.length_in_seconds,
            env.ledger().timestamp(),
        ))
    }

    /// Pooled escrow balance held for `sender`.
    pub fn escrow_balance(env: Env, sender: Address) -> Result<i128, ContractError> {
        Ok(registry::load_registry(&env, &sender)?.escrow.balance())
    }

    /// Receivers with a stream record in the sender's registry.
    pub fn get_receivers(env: Env, sender: Address) -> Result<Vec<Address>, ContractError> {
        Ok(registry::load_registry(&env, &sender)?.streams.keys())
    }

    pub fn get_config(env: Env) -> Result<Config, ContractError> {
        get_config(&env)
    }
}
