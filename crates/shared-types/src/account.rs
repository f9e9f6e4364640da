//! The account entity.
//!
//! Accounts are created the first time a key id receives funds and are never
//! destroyed. A delegate account additionally carries the votes it has
//! received, which drive both its position in the top-N delegate list and
//! the inflation credited to it per produced block.

use crate::coins::TokenSymbol;
use crate::ids::{KeyId, RegId};
use serde::{Deserialize, Serialize};
use shared_crypto::PublicKey;
use std::collections::BTreeMap;
use thiserror::Error;

/// Balance mutation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Not enough free balance for a debit
    #[error("insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Token being debited
        symbol: TokenSymbol,
        /// Free balance available
        have: u64,
        /// Amount requested
        need: u64,
    },

    /// Credit would overflow the balance counter
    #[error("{symbol} balance overflow")]
    BalanceOverflow {
        /// Token being credited
        symbol: TokenSymbol,
    },
}

/// A chain account with multi-token balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Compact on-chain coordinate, assigned at first funded appearance.
    pub regid: RegId,
    /// Address hash of the owner key.
    pub keyid: KeyId,
    /// Owner public key, known once the owner has transacted.
    pub owner_pubkey: Option<PublicKey>,
    /// Dedicated miner key, registered by delegates that sign blocks with a
    /// key separate from their owner key.
    pub miner_pubkey: Option<PublicKey>,
    /// Free balance per token.
    pub tokens: BTreeMap<TokenSymbol, u64>,
    /// Votes received (delegates only; zero otherwise).
    pub received_votes: u64,
}

impl Account {
    /// Create an account with no balances.
    pub fn new(regid: RegId, keyid: KeyId, owner_pubkey: Option<PublicKey>) -> Self {
        Self {
            regid,
            keyid,
            owner_pubkey,
            miner_pubkey: None,
            tokens: BTreeMap::new(),
            received_votes: 0,
        }
    }

    /// Free balance of a token.
    pub fn free_balance(&self, symbol: TokenSymbol) -> u64 {
        self.tokens.get(&symbol).copied().unwrap_or(0)
    }

    /// Credit `amount` of `symbol`.
    pub fn add_balance(&mut self, symbol: TokenSymbol, amount: u64) -> Result<(), AccountError> {
        let balance = self.tokens.entry(symbol).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow { symbol })?;
        Ok(())
    }

    /// Debit `amount` of `symbol`.
    pub fn sub_balance(&mut self, symbol: TokenSymbol, amount: u64) -> Result<(), AccountError> {
        let have = self.free_balance(symbol);
        if have < amount {
            return Err(AccountError::InsufficientBalance {
                symbol,
                have,
                need: amount,
            });
        }
        self.tokens.insert(symbol, have - amount);
        Ok(())
    }

    /// Per-block inflation credited to this delegate when it produces a
    /// block:
    ///
    /// `interest = received_votes * delegate_num * subsidy / year_height / 100`
    ///
    /// where `subsidy` is the current subsidy rate in percent and
    /// `year_height` the number of blocks per year at this height.
    pub fn block_inflate_interest(
        &self,
        delegate_num: u32,
        subsidy_rate: u64,
        year_height: u64,
    ) -> u64 {
        if year_height == 0 {
            return 0;
        }
        let interest = self.received_votes as u128 * delegate_num as u128 * subsidy_rate as u128
            / year_height as u128
            / 100;
        interest as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::COIN;

    fn test_account() -> Account {
        Account::new(RegId::new(2, 1), KeyId([0xAA; 20]), None)
    }

    #[test]
    fn test_balance_roundtrip() {
        let mut account = test_account();
        account.add_balance(TokenSymbol::Wicc, 500).unwrap();
        assert_eq!(account.free_balance(TokenSymbol::Wicc), 500);

        account.sub_balance(TokenSymbol::Wicc, 200).unwrap();
        assert_eq!(account.free_balance(TokenSymbol::Wicc), 300);
    }

    #[test]
    fn test_overdraw_rejected() {
        let mut account = test_account();
        account.add_balance(TokenSymbol::Wusd, 100).unwrap();

        let err = account.sub_balance(TokenSymbol::Wusd, 101).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientBalance {
                symbol: TokenSymbol::Wusd,
                have: 100,
                need: 101,
            }
        );
    }

    #[test]
    fn test_balances_are_per_token() {
        let mut account = test_account();
        account.add_balance(TokenSymbol::Wicc, 10).unwrap();
        assert_eq!(account.free_balance(TokenSymbol::Wusd), 0);
    }

    #[test]
    fn test_inflate_interest() {
        let mut account = test_account();
        account.received_votes = 210_000 * COIN;

        // 11 delegates, 5% subsidy, 10_512_000 blocks per year (3s interval)
        let interest = account.block_inflate_interest(11, 5, 10_512_000);
        assert_eq!(
            interest,
            (210_000u128 * COIN as u128 * 11 * 5 / 10_512_000 / 100) as u64
        );
    }

    #[test]
    fn test_inflate_interest_no_votes() {
        let account = test_account();
        assert_eq!(account.block_inflate_interest(11, 5, 10_512_000), 0);
    }
}
