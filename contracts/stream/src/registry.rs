use soroban_sdk::{contracttype, log, Address, Env, Map};

use crate::escrow::EscrowAccount;
use crate::{ContractError, DataKey, Stream, StreamStatus, TTL_EXTEND_TO, TTL_THRESHOLD};

/// A sender's streams keyed by receiver, plus the one escrow that backs all of them.
#[contracttype]
#[derive(Clone, Debug)]
pub struct Registry {
    pub escrow: EscrowAccount,
    pub streams: Map<Address, Stream>,
}

/// What `upsert_stream` did to the receiver's record.
///
/// `Reset` is returned whenever a record already existed, whether it was
/// pending or active: re-creating a stream restarts its clock unconditionally.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
    Inserted = 0,
    Reset = 1,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub(crate) fn load_registry(env: &Env, sender: &Address) -> Result<Registry, ContractError> {
    env.storage()
        .persistent()
        .get(&DataKey::Registry(sender.clone()))
        .ok_or(ContractError::RegistryNotFound)
}

/// Returns the sender's registry, opening a fresh one (with an empty escrow)
/// if none exists yet. Nothing is persisted until `save_registry`.
pub(crate) fn get_or_create(env: &Env, sender: &Address) -> Registry {
    match load_registry(env, sender) {
        Ok(registry) => registry,
        Err(_) => {
            log!(env, "opening registry", sender.clone());
            Registry {
                escrow: EscrowAccount::open(sender.clone()),
                streams: Map::new(env),
            }
        }
    }
}

pub(crate) fn save_registry(env: &Env, sender: &Address, registry: &Registry) {
    let key = DataKey::Registry(sender.clone());
    env.storage().persistent().set(&key, registry);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

// ---------------------------------------------------------------------------
// Stream records
// ---------------------------------------------------------------------------

impl Registry {
    /// Insert or overwrite the stream keyed by `receiver`.
    ///
    /// A new record starts `Pending`. An existing record keeps its status but
    /// has `length_in_seconds` and `start_time` replaced, so an accepted
    /// stream's vesting clock restarts at `now`. No activity guard applies.
    pub(crate) fn upsert_stream(
        &mut self,
        sender: &Address,
        receiver: &Address,
        length_in_seconds: u64,
        now: u64,
    ) -> UpsertOutcome {
        match self.streams.get(receiver.clone()) {
            Some(mut stream) => {
                stream.length_in_seconds = length_in_seconds;
                stream.start_time = now;
                self.streams.set(receiver.clone(), stream);
                UpsertOutcome::Reset
            }
            None => {
                let stream = Stream {
                    sender: sender.clone(),
                    receiver: receiver.clone(),
                    length_in_seconds,
                    start_time: now,
                    status: StreamStatus::Pending,
                };
                self.streams.set(receiver.clone(), stream);
                UpsertOutcome::Inserted
            }
        }
    }

    pub(crate) fn require_stream(&self, receiver: &Address) -> Result<Stream, ContractError> {
        self.streams
            .get(receiver.clone())
            .ok_or(ContractError::StreamNotFound)
    }

    pub(crate) fn put_stream(&mut self, stream: Stream) {
        self.streams.set(stream.receiver.clone(), stream);
    }
}
