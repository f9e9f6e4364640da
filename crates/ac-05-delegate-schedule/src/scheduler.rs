//! Slot → delegate assignment.
//!
//! Every epoch (N blocks, N = committee size) the committee order is
//! permuted by a deterministic digest-chain shuffle seeded on the epoch
//! index. Producing and validating nodes run the same shuffle over the
//! same committed vote state, so they agree on every slot's delegate.

use crate::error::ScheduleError;
use ac_01_chain_params::ChainParams;
use ac_02_state_cache::DelegateCache;
use shared_crypto::Blake3Hasher;
use shared_types::RegId;

/// Deterministic delegate schedule over one network's parameters.
#[derive(Clone, Debug)]
pub struct DelegateScheduler {
    params: ChainParams,
}

impl DelegateScheduler {
    /// Create a scheduler for a network.
    pub fn new(params: ChainParams) -> Self {
        Self { params }
    }

    /// The committee for the epoch containing `height`: top-N delegates by
    /// committed votes, in vote order.
    pub fn top_delegates(&self, delegates: &DelegateCache) -> Result<Vec<RegId>, ScheduleError> {
        let total = self.params.total_delegate_num as usize;
        let list = delegates.top_delegates(total);
        if list.len() < total {
            return Err(ScheduleError::NotEnoughDelegates {
                have: list.len(),
                need: total,
            });
        }
        Ok(list)
    }

    /// Permute the committee for the epoch containing `height`.
    ///
    /// The digest chain starts from the decimal epoch index; each round
    /// reads four little-endian u64 lanes from the current digest, each
    /// lane swapping the walk position with `lane % N`, then feeds the
    /// digest back into the hasher for the next round. The walk advances
    /// one position per swap and stops mid-round at N.
    pub fn shuffle_delegates(&self, height: u32, delegates: &mut [RegId]) {
        let total = delegates.len() as u64;
        if total == 0 {
            return;
        }

        let epoch = height as u64 / total + u64::from(height as u64 % total > 0);
        let mut hasher = Blake3Hasher::new();
        hasher.update(epoch.to_string().as_bytes());
        let mut seed = hasher.finalize();

        let mut i = 0usize;
        while i < delegates.len() {
            for lane in 0..4 {
                if i >= delegates.len() {
                    break;
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&seed[lane * 8..lane * 8 + 8]);
                let target = (u64::from_le_bytes(raw) % total) as usize;
                delegates.swap(i, target);
                i += 1;
            }
            hasher.update(&seed);
            seed = hasher.finalize();
        }
    }

    /// The delegate assigned to the slot containing `time`.
    pub fn slot_delegate(&self, time: i64, height: u32, delegates: &[RegId]) -> RegId {
        let interval = self.params.block_interval(height) as i64;
        let slot = time / interval;
        let index = slot as u64 % delegates.len() as u64;
        let delegate = delegates[index as usize];
        tracing::debug!(time, slot, index, %delegate, "slot assignment");
        delegate
    }

    /// Earliest time the slot after `prev_time` opens at `height`.
    pub fn next_slot_time(&self, prev_time: i64, height: u32) -> i64 {
        prev_time + self.params.block_interval(height) as i64
    }

    /// Network parameters this scheduler follows.
    pub fn params(&self) -> &ChainParams {
        &self.params
    }
}
