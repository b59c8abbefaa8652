use soroban_sdk::{contracttype, log, token, Address, Env};

use crate::ContractError;

/// Custodial escrow bound to a single sender's registry.
///
/// The asset itself is held by the contract address; this record is the
/// sender's share of it. Funds backing every stream of the sender are pooled
/// here. Only the contract can sign transfers out of its own address, and
/// within the contract only the methods below touch the pooled balance, so
/// holding an `EscrowAccount` is what authorises moving these funds.
///
/// A Stellar Asset Contract balance needs no trustline for a contract
/// address, so opening the account is all the registration the asset needs
/// before the first deposit.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowAccount {
    owner: Address,
    balance: i128,
}

impl EscrowAccount {
    /// Opens an empty escrow for `owner`. Only the registry creates these.
    pub(crate) fn open(owner: Address) -> Self {
        EscrowAccount { owner, balance: 0 }
    }

    pub fn balance(&self) -> i128 {
        self.balance
    }

    /// Pull `amount` of the asset from `from` into the contract and credit it
    /// to this escrow. A zero amount is accepted and moves nothing.
    pub(crate) fn deposit(
        &mut self,
        env: &Env,
        asset: &Address,
        from: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        if amount < 0 {
            return Err(ContractError::InvalidAmount);
        }
        if amount == 0 {
            return Ok(());
        }

        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(ContractError::BalanceOverflow)?;

        // Panics (and rolls back the invocation) if `from` cannot cover it.
        token::Client::new(env, asset).transfer(from, &env.current_contract_address(), &amount);

        self.balance = balance;
        Ok(())
    }

    /// Release `amount` from this escrow to `to`.
    pub(crate) fn transfer_out(
        &mut self,
        env: &Env,
        asset: &Address,
        to: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        if amount < 0 {
            return Err(ContractError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(ContractError::InsufficientEscrow);
        }
        if amount == 0 {
            return Ok(());
        }

        self.balance -= amount;
        token::Client::new(env, asset).transfer(&env.current_contract_address(), to, &amount);

        log!(
            env,
            "escrow release",
            self.owner.clone(),
            to.clone(),
            amount,
            self.balance
        );
        Ok(())
    }
}
