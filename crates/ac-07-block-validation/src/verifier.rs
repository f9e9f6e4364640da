//! The block verifier: the assembler's mirror in validation mode.
//!
//! A receiving node recomputes the delegate schedule, checks the header
//! against it, and optionally re-executes every packed transaction on a
//! scratch cache, comparing fuel totals against the header. Nothing the
//! verifier does touches committed state; the scratch view dies with the
//! call.

use crate::error::BlockValidationError;
use ac_01_chain_params::consensus::{MAX_BLOCK_RUN_STEP, MAX_SIGNATURE_SIZE};
use ac_01_chain_params::ChainParams;
use ac_02_state_cache::CacheWrapper;
use ac_03_transactions::{Block, BlockStore, ExecuteContext, INIT_TX_VERSION};
use ac_05_delegate_schedule::DelegateScheduler;
use shared_crypto::verify_signature;
use shared_types::Account;
use tracing::debug;

/// Validates candidate blocks against a committed state view.
pub struct BlockVerifier {
    scheduler: DelegateScheduler,
    params: ChainParams,
}

impl BlockVerifier {
    /// Create a verifier for a network.
    pub fn new(params: ChainParams) -> Self {
        Self {
            scheduler: DelegateScheduler::new(params.clone()),
            params,
        }
    }

    /// Verify a candidate block against the committed view `committed` and
    /// chain history in `store`. With `run_txs` (the default for accepting
    /// blocks), transactions 1..n are re-executed on a scratch cache and
    /// the fuel totals compared.
    pub fn verify_block(
        &self,
        block: &Block,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        run_txs: bool,
    ) -> Result<(), BlockValidationError> {
        let reward = block
            .reward_tx()
            .ok_or(BlockValidationError::MissingReward)?;

        // Schedule: the producer must be the slot delegate for block.time.
        let mut delegates = self.scheduler.top_delegates(&committed.delegates)?;
        self.scheduler
            .shuffle_delegates(block.header.height, &mut delegates);
        let expected = self
            .scheduler
            .slot_delegate(block.header.time, block.header.height, &delegates);

        let delegate_account = committed
            .accounts
            .get_account(&expected)
            .ok_or(BlockValidationError::DelegateAccountMissing(expected))?;

        if block.header.nonce > self.params.max_nonce {
            return Err(BlockValidationError::NonceOutOfRange {
                nonce: block.header.nonce,
                max: self.params.max_nonce,
            });
        }

        if block.header.merkle_root != block.build_merkle_root() {
            return Err(BlockValidationError::MerkleMismatch);
        }

        self.check_slot_repeat(block, committed, store, &delegate_account)?;

        let producer = committed
            .accounts
            .get_account(&reward.txuid())
            .ok_or(BlockValidationError::DelegateAccountMissing(reward.txuid()))?;
        if producer.regid != delegate_account.regid {
            return Err(BlockValidationError::WrongDelegate {
                expected: delegate_account.regid,
                got: producer.regid,
            });
        }

        self.check_header_signature(block, &producer)?;

        if reward.version() != INIT_TX_VERSION {
            return Err(BlockValidationError::BadRewardVersion {
                got: reward.version(),
                expected: INIT_TX_VERSION,
            });
        }

        if run_txs {
            self.run_transactions(block, committed)?;
        }

        debug!(
            height = block.header.height,
            txs = block.txs.len(),
            "block verified"
        );
        Ok(())
    }

    /// One delegate must not produce two blocks within a single interval.
    fn check_slot_repeat(
        &self,
        block: &Block,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        delegate: &Account,
    ) -> Result<(), BlockValidationError> {
        let first_past_genesis = block.header.height == 1
            && block.header.prev_hash == self.params.genesis_block_hash;
        if first_past_genesis {
            return Ok(());
        }

        let prev_index = store
            .get_index(&block.header.prev_hash)
            .ok_or(BlockValidationError::MissingPrevBlock)?;
        let prev_block = store
            .read_block(&prev_index)
            .ok_or(BlockValidationError::MissingPrevBlock)?;
        let prev_reward = prev_block
            .reward_tx()
            .ok_or(BlockValidationError::MissingReward)?;

        let prev_delegate = committed
            .accounts
            .get_account(&prev_reward.txuid())
            .ok_or(BlockValidationError::DelegateAccountMissing(prev_reward.txuid()))?;

        let interval = self.params.block_interval(block.header.height) as i64;
        if block.header.time - prev_block.header.time < interval
            && prev_delegate.regid == delegate.regid
        {
            return Err(BlockValidationError::SlotRepeat(delegate.regid));
        }
        Ok(())
    }

    /// The header must verify against the delegate's owner key, falling
    /// back to its miner key.
    fn check_header_signature(
        &self,
        block: &Block,
        producer: &Account,
    ) -> Result<(), BlockValidationError> {
        let signature = &block.header.signature;
        if signature.is_empty() || signature.as_bytes().len() > MAX_SIGNATURE_SIZE {
            return Err(BlockValidationError::BadSignatureSize(
                signature.as_bytes().len(),
            ));
        }

        let digest = block.header.signature_hash();
        let owner_ok = producer
            .owner_pubkey
            .as_ref()
            .is_some_and(|key| verify_signature(&digest, signature, key));
        let miner_ok = || {
            producer
                .miner_pubkey
                .as_ref()
                .is_some_and(|key| verify_signature(&digest, signature, key))
        };
        if owner_ok || miner_ok() {
            Ok(())
        } else {
            Err(BlockValidationError::BadSignature)
        }
    }

    /// Re-execute transactions 1..n on a scratch view, enforcing the
    /// duplicate, run-step and fuel-total rules.
    fn run_transactions(
        &self,
        block: &Block,
        committed: &CacheWrapper,
    ) -> Result<(), BlockValidationError> {
        let mut scratch = committed.fork();
        let mut total_fuel = 0u64;
        let mut total_run_step = 0u64;

        for (index, tx) in block.txs.iter().enumerate().skip(1) {
            let txid = tx.tx_hash();
            if scratch.tx_seen.have_tx(&txid) {
                return Err(BlockValidationError::DuplicateTx(hex::encode(txid)));
            }

            let mut ctx = ExecuteContext {
                height: block.header.height,
                index: index as u32,
                fuel_rate: block.header.fuel_rate,
                block_time: block.header.time,
                params: &self.params,
                cache: &mut scratch,
            };
            if let Err(err) = tx.execute(&mut ctx) {
                let height = block.header.height;
                scratch
                    .exec_log
                    .set_execute_fail(height, txid, err.reject_code(), err.to_string());
                return Err(BlockValidationError::ExecutionFailed {
                    txid: hex::encode(txid),
                    source: err,
                });
            }
            scratch.tx_seen.add_tx(txid);

            total_run_step += tx.run_step();
            if total_run_step > MAX_BLOCK_RUN_STEP {
                return Err(BlockValidationError::RunStepOverflow {
                    total: total_run_step,
                    max: MAX_BLOCK_RUN_STEP,
                });
            }
            total_fuel += tx.fuel(block.header.height, block.header.fuel_rate);
        }

        if total_fuel != block.header.fuel {
            return Err(BlockValidationError::FuelMismatch {
                computed: total_fuel,
                header: block.header.fuel,
            });
        }
        Ok(())
    }
}
