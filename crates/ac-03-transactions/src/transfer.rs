//! Coin transfer transactions.

use crate::context::ExecuteContext;
use crate::error::{TxError, TxResult};
use crate::tx::{check_sender_signature, debit_fee, payload_bytes, TxKind};
use serde::{Deserialize, Serialize};
use shared_crypto::Signature;
use shared_types::{KeyId, RegId, TokenSymbol};

/// Consensus bound on transfer memo size, bytes.
pub const MAX_MEMO_SIZE: usize = 100;

/// Single-leg base coin transfer. Fee is always WICC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseCoinTransferTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Sender.
    pub txuid: RegId,
    /// Fee in WICC smallest units.
    pub fee_amount: u64,
    /// Receiving address hash.
    pub to: KeyId,
    /// Amount of WICC transferred.
    pub amount: u64,
    /// Optional user memo.
    pub memo: Vec<u8>,
    /// Sender signature.
    pub signature: Signature,
}

impl BaseCoinTransferTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::BaseCoinTransfer,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_amount,
            self.to,
            self.amount,
            &self.memo,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        if self.amount == 0 {
            return Err(TxError::ZeroAmount);
        }
        if self.memo.len() > MAX_MEMO_SIZE {
            return Err(TxError::MemoTooLarge(self.memo.len()));
        }
        let sender = ctx.account(&self.txuid)?;
        check_sender_signature(&sender, &self.signature_payload(), &self.signature)?;

        let needed = self.amount.saturating_add(self.fee_amount);
        let have = sender.free_balance(TokenSymbol::Wicc);
        if have < needed {
            return Err(TxError::Balance(
                shared_types::AccountError::InsufficientBalance {
                    symbol: TokenSymbol::Wicc,
                    have,
                    need: needed,
                },
            ));
        }
        Ok(())
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let mut sender = ctx.account(&self.txuid)?;
        sender.sub_balance(TokenSymbol::Wicc, self.amount)?;
        debit_fee(ctx, &mut sender, TokenSymbol::Wicc, self.fee_amount)?;

        let mut receiver = ctx.account_by_keyid_or_create(&self.to);
        receiver.add_balance(TokenSymbol::Wicc, self.amount)?;
        ctx.cache.accounts.set_account(&receiver);
        Ok(())
    }
}

/// One leg of a multi-token transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    /// Receiving address hash.
    pub to: KeyId,
    /// Transferred token.
    pub symbol: TokenSymbol,
    /// Amount in smallest units.
    pub amount: u64,
}

/// Multi-leg, multi-token transfer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UCoinTransferTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Sender.
    pub txuid: RegId,
    /// Fee token.
    pub fee_symbol: TokenSymbol,
    /// Fee amount in smallest units.
    pub fee_amount: u64,
    /// Transfer legs, applied in order.
    pub transfers: Vec<TransferLeg>,
    /// Optional user memo.
    pub memo: Vec<u8>,
    /// Sender signature.
    pub signature: Signature,
}

impl UCoinTransferTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::UCoinTransfer,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_symbol,
            self.fee_amount,
            &self.transfers,
            &self.memo,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        if self.transfers.is_empty() || self.transfers.iter().any(|leg| leg.amount == 0) {
            return Err(TxError::ZeroAmount);
        }
        if self.memo.len() > MAX_MEMO_SIZE {
            return Err(TxError::MemoTooLarge(self.memo.len()));
        }
        let sender = ctx.account(&self.txuid)?;
        check_sender_signature(&sender, &self.signature_payload(), &self.signature)
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let mut sender = ctx.account(&self.txuid)?;
        for leg in &self.transfers {
            sender.sub_balance(leg.symbol, leg.amount)?;
        }
        debit_fee(ctx, &mut sender, self.fee_symbol, self.fee_amount)?;

        for leg in &self.transfers {
            let mut receiver = ctx.account_by_keyid_or_create(&leg.to);
            receiver.add_balance(leg.symbol, leg.amount)?;
            ctx.cache.accounts.set_account(&receiver);
        }
        Ok(())
    }
}
