//! The deterministic packing order.
//!
//! Candidates sort by a banded comparison: priorities further apart than
//! the band width order by priority; otherwise fee-per-kB decides within an
//! epsilon; the transaction hash breaks exact ties. The relation is total,
//! so identical mempool contents and fuel rate yield identical iteration
//! order on every node.

use crate::pool::Mempool;
use ac_02_state_cache::TxSeenCache;
use ac_03_transactions::Transaction;
use shared_types::TxId;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Priorities closer than this compare by fee-per-kB instead.
pub const PRIORITY_BAND: f64 = 1000.0;

/// Fee-per-kB values closer than this compare by hash instead.
pub const FEE_PER_KB_EPSILON: f64 = 1e-8;

/// One packing candidate with its ordering keys.
#[derive(Clone, Debug)]
pub struct TxPriority {
    /// Mempool priority.
    pub priority: f64,
    /// Net fee density: `(fee - fuel) * 1000 / size`.
    pub fee_per_kb: f64,
    /// Hash tie-breaker (cached).
    pub txid: TxId,
    /// The candidate transaction.
    pub tx: Arc<Transaction>,
}

impl TxPriority {
    /// Build a candidate, caching its hash.
    pub fn new(priority: f64, fee_per_kb: f64, tx: Arc<Transaction>) -> Self {
        Self {
            priority,
            fee_per_kb,
            txid: tx.tx_hash(),
            tx,
        }
    }
}

impl PartialEq for TxPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TxPriority {}

impl PartialOrd for TxPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TxPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        if (self.priority - other.priority).abs() > PRIORITY_BAND {
            return self.priority.total_cmp(&other.priority);
        }
        if (self.fee_per_kb - other.fee_per_kb).abs() > FEE_PER_KB_EPSILON {
            return self.fee_per_kb.total_cmp(&other.fee_per_kb);
        }
        self.txid.cmp(&other.txid)
    }
}

/// Collect the packing candidates for a block at `height`, ordered
/// ascending; iterate in reverse for best-first. Transactions already
/// confirmed (per the seen cache) are excluded.
pub fn collect_priorities(
    mempool: &Mempool,
    tx_seen: &TxSeenCache,
    height: u32,
    fuel_rate: u32,
) -> BTreeSet<TxPriority> {
    let mut candidates = BTreeSet::new();
    for (txid, entry) in mempool.entries() {
        if tx_seen.have_tx(txid) {
            continue;
        }
        let fuel = entry.tx.fuel(height, fuel_rate);
        let net_fee = entry.fee_amount.saturating_sub(fuel);
        let fee_per_kb = net_fee as f64 / entry.size.max(1) as f64 * 1000.0;
        candidates.insert(TxPriority::new(entry.priority, fee_per_kb, entry.tx.clone()));
    }
    tracing::debug!(
        count = candidates.len(),
        height,
        fuel_rate,
        "collected packing candidates"
    );
    candidates
}
