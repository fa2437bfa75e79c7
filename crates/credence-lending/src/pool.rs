//! # Lending Pool
//!
//! Balances for the funds side of lending: the `reserve` loans are drawn
//! from and repaid into, the `treasury` that collects fees and seized
//! collateral, and the collateral `escrow`. Each movement is checked before
//! any balance changes and appended to the transfer log. Funds entering or
//! leaving the pool come from or go to an `External` party.

use credence_core::{Amount, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    /// Lendable reserve.
    Reserve,
    /// Fees and recoveries.
    Treasury,
    /// Collateral held on behalf of borrowers.
    Escrow,
    /// A party outside the pool.
    External(SubjectId),
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reserve => f.write_str("reserve"),
            Self::Treasury => f.write_str("treasury"),
            Self::Escrow => f.write_str("escrow"),
            Self::External(s) => write!(f, "external:{s}"),
        }
    }
}

/// One logged movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Position in the log.
    pub sequence: u64,
    /// Debited account.
    pub from: Account,
    /// Credited account.
    pub to: Account,
    /// Amount moved.
    pub amount: Amount,
    /// What the movement was for.
    pub memo: String,
    /// When.
    pub timestamp: Timestamp,
}

/// Pool balances and transfer log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LendingPool {
    reserve: Amount,
    treasury: Amount,
    escrowed_collateral: Amount,
    transfers: Vec<Transfer>,
}

impl LendingPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lendable reserve.
    pub fn reserve(&self) -> Amount {
        self.reserve
    }

    /// Treasury balance.
    pub fn treasury(&self) -> Amount {
        self.treasury
    }

    /// Collateral currently held.
    pub fn escrowed_collateral(&self) -> Amount {
        self.escrowed_collateral
    }

    /// Every movement, oldest first.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Add outside funds to the reserve.
    pub fn provide_liquidity(
        &mut self,
        provider: &SubjectId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Amount, LendingError> {
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount("liquidity must be positive".into()));
        }
        let reserve = self.reserve.checked_add(amount)?;
        self.reserve = reserve;
        self.log(Account::External(provider.clone()), Account::Reserve, amount, "liquidity", now);
        Ok(reserve)
    }

    /// Fail unless the reserve holds at least `required`.
    pub fn ensure_reserve(&self, required: Amount) -> Result<(), LendingError> {
        if self.reserve < required {
            return Err(LendingError::InsufficientReserve {
                required,
                available: self.reserve,
            });
        }
        Ok(())
    }

    /// Pay `net` to the borrower and `fee` to the treasury out of the reserve.
    pub fn disburse(
        &mut self,
        borrower: &SubjectId,
        net: Amount,
        fee: Amount,
        memo: &str,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        let total = net.checked_add(fee)?;
        let reserve = debit("reserve", self.reserve, total)?;
        let treasury = self.treasury.checked_add(fee)?;
        self.reserve = reserve;
        self.treasury = treasury;
        self.log(Account::Reserve, Account::External(borrower.clone()), net, memo, now);
        if !fee.is_zero() {
            self.log(Account::Reserve, Account::Treasury, fee, memo, now);
        }
        Ok(())
    }

    /// Take a payment from `payer`: `to_reserve` back into the reserve and
    /// `to_treasury` into the treasury.
    pub fn collect(
        &mut self,
        payer: &SubjectId,
        to_reserve: Amount,
        to_treasury: Amount,
        memo: &str,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        let reserve = self.reserve.checked_add(to_reserve)?;
        let treasury = self.treasury.checked_add(to_treasury)?;
        self.reserve = reserve;
        self.treasury = treasury;
        if !to_reserve.is_zero() {
            self.log(Account::External(payer.clone()), Account::Reserve, to_reserve, memo, now);
        }
        if !to_treasury.is_zero() {
            self.log(Account::External(payer.clone()), Account::Treasury, to_treasury, memo, now);
        }
        Ok(())
    }

    /// Move a borrower's collateral into escrow.
    pub fn escrow_deposit(
        &mut self,
        borrower: &SubjectId,
        amount: Amount,
        memo: &str,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        self.escrowed_collateral = self.escrowed_collateral.checked_add(amount)?;
        self.log(Account::External(borrower.clone()), Account::Escrow, amount, memo, now);
        Ok(())
    }

    /// Return escrowed collateral to the borrower.
    pub fn escrow_release(
        &mut self,
        borrower: &SubjectId,
        amount: Amount,
        memo: &str,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        self.escrowed_collateral = debit("escrow", self.escrowed_collateral, amount)?;
        self.log(Account::Escrow, Account::External(borrower.clone()), amount, memo, now);
        Ok(())
    }

    /// Move escrowed collateral to the treasury.
    pub fn escrow_seize(&mut self, amount: Amount, memo: &str, now: Timestamp) -> Result<(), LendingError> {
        let escrow = debit("escrow", self.escrowed_collateral, amount)?;
        let treasury = self.treasury.checked_add(amount)?;
        self.escrowed_collateral = escrow;
        self.treasury = treasury;
        self.log(Account::Escrow, Account::Treasury, amount, memo, now);
        Ok(())
    }

    fn log(&mut self, from: Account, to: Account, amount: Amount, memo: &str, now: Timestamp) {
        tracing::debug!(%from, %to, %amount, memo, "pool transfer");
        self.transfers.push(Transfer {
            sequence: self.transfers.len() as u64,
            from,
            to,
            amount,
            memo: memo.to_string(),
            timestamp: now,
        });
    }
}

fn debit(account: &str, balance: Amount, amount: Amount) -> Result<Amount, LendingError> {
    balance
        .checked_sub(amount)
        .map_err(|_| LendingError::InsufficientFunds {
            account: account.to_string(),
            needed: amount,
            available: balance,
        })
}
